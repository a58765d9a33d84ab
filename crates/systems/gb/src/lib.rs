//! Game Boy / Game Boy Color picture processing unit.
//!
//! [`Ppu`] is the chip itself. [`GbBus`] places it in the system memory map
//! and lends the rest of the machine to it as a [`PpuHost`]. [`GbSystem`]
//! runs whole frames through the common [`System`] trait for the frontend.

use emu_core::{types::Frame, System};
use serde::de::Error as _;

pub mod bus;
pub mod config;
pub mod ppu;
pub mod ppu_renderer;

pub use bus::{GbBus, SystemMemory};
pub use config::{HardwareModel, PpuConfig};
pub use ppu::{Interrupt, Mode, Ppu, PpuHost, Screen};

/// Cycles the interpreter reports per instruction when nothing else drives
/// the bus.
const IDLE_STEP_CYCLES: u32 = 4;

#[derive(thiserror::Error, Debug)]
pub enum GbError {
    #[error("Invalid save state: {0}")]
    InvalidSaveState(String),
    #[error("Save state size mismatch: expected {expected} bytes, found {actual}")]
    SnapshotSize { expected: usize, actual: usize },
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct GbSystem {
    config: PpuConfig,
    bus: GbBus,
}

impl Default for GbSystem {
    fn default() -> Self {
        Self::new(PpuConfig::default())
    }
}

impl GbSystem {
    pub fn new(config: PpuConfig) -> Self {
        Self {
            bus: GbBus::new(config.clone()),
            config,
        }
    }

    pub fn bus(&self) -> &GbBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut GbBus {
        &mut self.bus
    }
}

impl System for GbSystem {
    type Error = GbError;

    fn reset(&mut self) {
        self.bus = GbBus::new(self.config.clone());
    }

    /// Run until the PPU presents a frame. With the LCD off that never
    /// happens, so one frame's worth of cycles is the limit and the last
    /// presented frame is returned again.
    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        let start = self.bus.memory.frames_presented();
        let mut cycles = 0;
        while cycles < ppu::CYCLES_PER_FRAME && self.bus.memory.frames_presented() == start {
            self.bus.step(IDLE_STEP_CYCLES);
            cycles += IDLE_STEP_CYCLES;
        }
        Ok(self.bus.frame().clone())
    }

    fn save_state(&self) -> serde_json::Value {
        let mut state = self.bus.save_state();
        state["system"] = "gb".into();
        state["version"] = 1.into();
        state
    }

    fn load_state(&mut self, v: &serde_json::Value) -> Result<(), serde_json::Error> {
        if v.get("system").and_then(|s| s.as_str()) != Some("gb") {
            return Err(serde_json::Error::custom("not a Game Boy save state"));
        }
        self.bus.load_state(v).map_err(serde_json::Error::custom)?;
        self.config.model = self.bus.ppu.config().model;
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }
}
