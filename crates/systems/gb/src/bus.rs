//! Game Boy memory bus around the PPU.
//!
//! Routes interpreter accesses to the PPU or to plain system memory and owns
//! OAM DMA. System memory doubles as the PPU's host: it supplies DMA source
//! bytes, collects interrupt requests and receives finished frames.
//!
//! # Memory Map
//!
//! ```text
//! $0000-$7FFF  ROM (flat 32KB image, no banking)
//! $8000-$9FFF  Video RAM (PPU; 2 banks on CGB)
//! $A000-$BFFF  External RAM (8KB)
//! $C000-$DFFF  Work RAM (8KB)
//! $E000-$FDFF  Echo RAM (mirror of $C000-$DDFF)
//! $FE00-$FE9F  OAM (PPU)
//! $FEA0-$FEFF  Not usable
//! $FF00-$FF7F  I/O registers ($FF40-$FF4B, $FF4F, $FF51-$FF55, $FF68-$FF6B to PPU)
//! $FF80-$FFFE  High RAM
//! $FFFF        Interrupt Enable
//! ```

use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::renderer::Renderer;
use emu_core::types::Frame;
use serde_json::{json, Value};

use crate::config::PpuConfig;
use crate::ppu::registers::*;
use crate::ppu::{Interrupt, Ppu, PpuHost, Screen};
use crate::ppu_renderer::{PpuRenderer, SoftwarePpuRenderer};
use crate::GbError;

const ROM_SIZE: usize = 0x8000;
const REG_IF: u16 = 0xFF0F;
const REG_IE: u16 = 0xFFFF;

/// Whether the PPU decodes this address.
fn is_ppu_address(addr: u16) -> bool {
    matches!(
        addr,
        VRAM_START..=VRAM_END
            | OAM_START..=OAM_END
            | REG_LCDC..=REG_LYC
            | REG_BGP..=REG_WX
            | REG_VBK
            | REG_HDMA1..=REG_HDMA5
            | REG_BCPS..=REG_OCPD
    )
}

/// Validated memory section of a save state, waiting to be applied.
struct MemorySnapshot {
    eram: Option<Vec<u8>>,
    wram: Option<Vec<u8>>,
    hram: Option<Vec<u8>>,
    ie: Option<u8>,
    if_reg: Option<u8>,
    dma: Option<u8>,
}

/// Everything on the bus except the PPU.
pub struct SystemMemory {
    rom: Vec<u8>,
    eram: [u8; 0x2000],
    wram: [u8; 0x2000],
    hram: [u8; 0x7F],
    /// I/O registers nobody here decodes; stored as written
    io: [u8; 0x80],
    ie: u8,
    if_reg: u8,
    dma: u8,
    renderer: SoftwarePpuRenderer,
    frames_presented: u64,
}

impl SystemMemory {
    pub fn new(config: &PpuConfig) -> Self {
        Self {
            rom: vec![0xFF; ROM_SIZE],
            eram: [0; 0x2000],
            wram: [0; 0x2000],
            hram: [0; 0x7F],
            io: [0xFF; 0x80],
            ie: 0,
            if_reg: 0,
            dma: 0xFF,
            renderer: SoftwarePpuRenderer::new(config.present_full_width),
            frames_presented: 0,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF => self.rom[addr as usize],
            0xA000..=0xBFFF => self.eram[(addr - 0xA000) as usize],
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize],
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize],
            REG_IF => 0xE0 | self.if_reg,
            REG_DMA => self.dma,
            0xFF00..=0xFF7F => self.io[(addr - 0xFF00) as usize],
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            REG_IE => self.ie,
            // VRAM, OAM and the unusable gap
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xA000..=0xBFFF => self.eram[(addr - 0xA000) as usize] = val,
            0xC000..=0xDFFF => self.wram[(addr - 0xC000) as usize] = val,
            0xE000..=0xFDFF => self.wram[(addr - 0xE000) as usize] = val,
            REG_IF => self.if_reg = val & 0x1F,
            0xFF00..=0xFF7F => self.io[(addr - 0xFF00) as usize] = val,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            REG_IE => self.ie = val,
            _ => log(LogCategory::Bus, LogLevel::Trace, || {
                format!("Bus: ignored write {:02X} to {:04X}", val, addr)
            }),
        }
    }

    /// Pending interrupt bits (IF, low five bits).
    pub fn interrupt_flags(&self) -> u8 {
        self.if_reg
    }

    /// Clear an interrupt's pending bit, as the interpreter does on dispatch.
    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.if_reg &= !interrupt.mask();
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn save_state(&self) -> Value {
        json!({
            "eram": self.eram.to_vec(),
            "wram": self.wram.to_vec(),
            "hram": self.hram.to_vec(),
            "ie": self.ie,
            "if": self.if_reg,
            "dma": self.dma,
        })
    }

    /// Parse and size-check a memory section without touching `self`.
    fn stage_state(&self, state: &Value) -> Result<MemorySnapshot, GbError> {
        fn bytes(state: &Value, field: &str, len: usize) -> Result<Option<Vec<u8>>, GbError> {
            let Some(value) = state.get(field) else {
                return Ok(None);
            };
            let bytes: Vec<u8> = serde_json::from_value(value.clone())
                .map_err(|e| GbError::InvalidSaveState(format!("{}: {}", field, e)))?;
            if bytes.len() != len {
                return Err(GbError::SnapshotSize {
                    expected: len,
                    actual: bytes.len(),
                });
            }
            Ok(Some(bytes))
        }
        let byte = |field: &str| state.get(field).and_then(Value::as_u64).map(|v| v as u8);

        Ok(MemorySnapshot {
            eram: bytes(state, "eram", self.eram.len())?,
            wram: bytes(state, "wram", self.wram.len())?,
            hram: bytes(state, "hram", self.hram.len())?,
            ie: byte("ie"),
            if_reg: byte("if"),
            dma: byte("dma"),
        })
    }

    fn commit_state(&mut self, snapshot: MemorySnapshot) {
        if let Some(eram) = snapshot.eram {
            self.eram.copy_from_slice(&eram);
        }
        if let Some(wram) = snapshot.wram {
            self.wram.copy_from_slice(&wram);
        }
        if let Some(hram) = snapshot.hram {
            self.hram.copy_from_slice(&hram);
        }
        if let Some(ie) = snapshot.ie {
            self.ie = ie;
        }
        if let Some(flags) = snapshot.if_reg {
            self.if_reg = flags & 0x1F;
        }
        if let Some(dma) = snapshot.dma {
            self.dma = dma;
        }
    }
}

impl PpuHost for SystemMemory {
    fn read(&self, addr: u16) -> u8 {
        SystemMemory::read(self, addr)
    }

    fn request_interrupt(&mut self, interrupt: Interrupt) {
        self.if_reg |= interrupt.mask();
    }

    fn present(&mut self, screen: &Screen) {
        self.renderer.present(screen);
        self.frames_presented += 1;
    }
}

/// Game Boy memory bus
pub struct GbBus {
    pub ppu: Ppu,
    pub memory: SystemMemory,
}

impl GbBus {
    pub fn new(config: PpuConfig) -> Self {
        Self {
            memory: SystemMemory::new(&config),
            ppu: Ppu::new(config),
        }
    }

    /// Copy a flat ROM image into $0000-$7FFF. Anything past 32KB is ignored.
    pub fn load_rom(&mut self, data: &[u8]) {
        let len = data.len().min(ROM_SIZE);
        self.memory.rom[..len].copy_from_slice(&data[..len]);
        if data.len() > ROM_SIZE {
            log(LogCategory::Bus, LogLevel::Warn, || {
                format!("Bus: ROM image truncated from {} bytes", data.len())
            });
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        if is_ppu_address(addr) {
            self.ppu.read(addr)
        } else {
            self.memory.read(addr)
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if addr == REG_DMA {
            self.oam_dma(val);
        } else if is_ppu_address(addr) {
            self.ppu.write(addr, val);
        } else {
            self.memory.write(addr, val);
        }
    }

    /// Advance the PPU, lending it the rest of the system as its host.
    pub fn step(&mut self, cycles: u32) {
        self.ppu.step(cycles, &mut self.memory);
    }

    /// The most recently presented frame.
    pub fn frame(&self) -> &Frame {
        self.memory.renderer.get_frame()
    }

    /// OAM DMA: copy 160 bytes from `page << 8` into OAM at once.
    fn oam_dma(&mut self, page: u8) {
        self.memory.dma = page;
        let src = (page as u16) << 8;
        log(LogCategory::Dma, LogLevel::Debug, || {
            format!("OAM DMA from {:04X}", src)
        });
        for i in 0..OAM_SIZE as u16 {
            let byte = self.read(src.wrapping_add(i));
            self.ppu.write_oam(i as usize, byte);
        }
    }

    pub fn save_state(&self) -> Value {
        json!({
            "ppu": self.ppu.save_state(),
            "memory": self.memory.save_state(),
        })
    }

    pub fn load_state(&mut self, state: &Value) -> Result<(), GbError> {
        let ppu = state
            .get("ppu")
            .ok_or_else(|| GbError::InvalidSaveState("missing \"ppu\"".to_string()))?;
        // Check memory first; the PPU load only commits once fully validated
        let memory = match state.get("memory") {
            Some(memory) => Some(self.memory.stage_state(memory)?),
            None => None,
        };
        self.ppu.load_state(ppu)?;
        if let Some(memory) = memory {
            self.memory.commit_state(memory);
        }
        Ok(())
    }
}
