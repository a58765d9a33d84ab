//! Game Boy / Game Boy Color picture processing unit.
//!
//! The PPU owns VRAM, OAM and every LCD register. The instruction interpreter
//! reaches it through [`Ppu::read`] / [`Ppu::write`] and drives it with
//! [`Ppu::step`], lending a [`PpuHost`] for interrupt requests, DMA source
//! reads and frame presentation.
//!
//! Register writes that affect derived state (sprite table, LYC comparison,
//! general-purpose DMA) are queued and applied at the start of the next step,
//! so no write ever needs access to the host.
//!
//! # Line timing
//!
//! ```text
//! cycle   0        80                 252                     456
//! LY 0-143 | OAM (2) | pixel transfer (3) | HBlank (0)            |
//! LY 144-153 |                  VBlank (1)                        |
//! ```
//!
//! The scanline is composited at HBlank entry and the finished frame is
//! presented at VBlank entry.

mod compositor;
mod hdma;
mod host;
pub mod palette;
pub mod registers;
mod screen;
pub mod sprites;
pub mod tiles;
mod timing;

use std::collections::VecDeque;

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{HardwareModel, PpuConfig};
use crate::GbError;
use compositor::{LineBuffers, LineContext};
use hdma::{DmaRequest, Hdma, BLOCK_BYTES};
use palette::{ColorPaletteRam, DmgPalettes};
use registers::*;
use sprites::SpriteTable;
use tiles::TileCache;

pub use host::{Interrupt, PpuHost};
pub use screen::{Screen, LINE_WIDTH, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use tiles::{TileDecodeEvent, TileObserver, TileSet};
pub use timing::{
    Mode, CYCLES_PER_FRAME, CYCLES_PER_LINE, MAX_STEP_CYCLES, OAM_SEARCH_END,
    PIXEL_TRANSFER_END, TOTAL_LINES, VISIBLE_LINES,
};

pub(crate) type Vram = [[u8; VRAM_SIZE]; 2];

/// CGB palette memory powers up white.
const CGB_INITIAL_COLOR: u16 = 0x7FFF;

/// Register side effects waiting for the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingUpdate {
    RefreshSprites,
    CompareLyc,
    GeneralDma { blocks: u8 },
}

/// Serialized PPU state. Decoded caches are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct PpuSnapshot {
    model: HardwareModel,
    registers: Registers,
    mode: Mode,
    line_cycles: u32,
    lcd_on: bool,
    frame_count: u64,
    vram: Vec<Vec<u8>>,
    oam: Vec<u8>,
    bg_colors: ColorPaletteRam,
    obj_colors: ColorPaletteRam,
    hdma: Hdma,
}

pub struct Ppu {
    config: PpuConfig,
    vram: Box<Vram>,
    oam: [u8; OAM_SIZE],
    regs: Registers,
    tiles: TileCache,
    dmg: DmgPalettes,
    bg_colors: ColorPaletteRam,
    obj_colors: ColorPaletteRam,
    sprites: SpriteTable,
    hdma: Hdma,
    mode: Mode,
    /// Cycles into the current scanline
    line_cycles: u32,
    lcd_on: bool,
    frame_count: u64,
    line: LineBuffers,
    screen: Screen,
    pending: VecDeque<PendingUpdate>,
    observer: Option<Box<dyn TileObserver>>,
}

impl Ppu {
    /// A PPU in the state the boot ROM leaves it: LCD on, LY 0, OAM search.
    pub fn new(config: PpuConfig) -> Self {
        let shades = config.dmg_shades;
        Self {
            vram: Box::new([[0; VRAM_SIZE]; 2]),
            oam: [0; OAM_SIZE],
            regs: Registers::default(),
            tiles: TileCache::new(),
            dmg: DmgPalettes::new(shades),
            bg_colors: ColorPaletteRam::new(CGB_INITIAL_COLOR),
            obj_colors: ColorPaletteRam::new(CGB_INITIAL_COLOR),
            sprites: SpriteTable::default(),
            hdma: Hdma::new(),
            mode: Mode::OamSearch,
            line_cycles: 0,
            lcd_on: true,
            frame_count: 0,
            line: LineBuffers::default(),
            screen: Screen::new(shades[0]),
            pending: VecDeque::new(),
            observer: None,
            config,
        }
    }

    pub fn config(&self) -> &PpuConfig {
        &self.config
    }

    #[inline]
    pub fn is_cgb(&self) -> bool {
        self.config.model == HardwareModel::Cgb
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.regs.ly
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcd_on
    }

    /// Frames completed (VBlank entries) since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn set_tile_observer(&mut self, observer: Option<Box<dyn TileObserver>>) {
        self.observer = observer;
    }

    #[inline]
    fn vram_bank(&self) -> usize {
        if self.is_cgb() {
            (self.regs.vbk & 1) as usize
        } else {
            0
        }
    }

    /// Read any address the PPU owns. Unowned addresses read 0xFF.
    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            VRAM_START..=VRAM_END => self.vram[self.vram_bank()][(addr - VRAM_START) as usize],
            OAM_START..=OAM_END => self.oam[(addr - OAM_START) as usize],
            REG_LCDC => self.regs.lcdc,
            REG_STAT => self.regs.stat | 0x80,
            REG_SCY => self.regs.scy,
            REG_SCX => self.regs.scx,
            REG_LY => self.regs.ly,
            REG_LYC => self.regs.lyc,
            REG_BGP => self.regs.bgp,
            REG_OBP0 => self.regs.obp0,
            REG_OBP1 => self.regs.obp1,
            REG_WY => self.regs.wy,
            REG_WX => self.regs.wx,
            REG_VBK if self.is_cgb() => 0xFE | self.regs.vbk,
            REG_HDMA5 if self.is_cgb() => self.hdma.read_control(),
            REG_BCPS if self.is_cgb() => self.bg_colors.read_index(),
            REG_BCPD if self.is_cgb() => self.bg_colors.read_data(),
            REG_OCPS if self.is_cgb() => self.obj_colors.read_index(),
            REG_OCPD if self.is_cgb() => self.obj_colors.read_data(),
            _ => 0xFF,
        }
    }

    /// Write any address the PPU owns. Unowned addresses are ignored.
    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            VRAM_START..=VRAM_END => self.write_vram(addr, val),
            OAM_START..=OAM_END => self.write_oam((addr - OAM_START) as usize, val),
            REG_LCDC => {
                let changed = self.regs.lcdc ^ val;
                self.regs.lcdc = val;
                if changed & LCDC_OBJ_SIZE != 0 {
                    self.queue(PendingUpdate::RefreshSprites);
                }
                if changed & LCDC_ENABLE != 0 {
                    log(LogCategory::PPU, LogLevel::Debug, || {
                        format!("PPU: LCDC enable -> {}", val & LCDC_ENABLE != 0)
                    });
                }
            }
            REG_STAT => {
                self.regs.stat = (self.regs.stat & !STAT_WRITABLE) | (val & STAT_WRITABLE);
            }
            REG_SCY => self.regs.scy = val,
            REG_SCX => self.regs.scx = val,
            REG_LY => {
                // Restart the frame from line 0
                self.regs.ly = 0;
                if self.lcd_on {
                    self.line_cycles = 0;
                    self.set_mode(Mode::OamSearch);
                }
                self.queue(PendingUpdate::CompareLyc);
            }
            REG_LYC => {
                self.regs.lyc = val;
                self.queue(PendingUpdate::CompareLyc);
            }
            REG_BGP => {
                self.regs.bgp = val;
                self.dmg.set_bgp(val);
            }
            REG_OBP0 => {
                self.regs.obp0 = val;
                self.dmg.set_obp(0, val);
            }
            REG_OBP1 => {
                self.regs.obp1 = val;
                self.dmg.set_obp(1, val);
            }
            REG_WY => self.regs.wy = val,
            REG_WX => self.regs.wx = val,
            _ if self.is_cgb() => self.write_cgb_register(addr, val),
            _ => log(LogCategory::Bus, LogLevel::Trace, || {
                format!("PPU: ignored write {:02X} to {:04X}", val, addr)
            }),
        }
        log(LogCategory::PPU, LogLevel::Trace, || {
            format!("PPU: write {:04X} <- {:02X} (LY={})", addr, val, self.regs.ly)
        });
    }

    fn write_cgb_register(&mut self, addr: u16, val: u8) {
        match addr {
            REG_VBK => self.regs.vbk = val & 1,
            REG_HDMA1 => self.hdma.write_source_hi(val),
            REG_HDMA2 => self.hdma.write_source_lo(val),
            REG_HDMA3 => self.hdma.write_dest_hi(val),
            REG_HDMA4 => self.hdma.write_dest_lo(val),
            REG_HDMA5 => match self.hdma.write_control(val) {
                DmaRequest::General { blocks } => {
                    self.queue(PendingUpdate::GeneralDma { blocks });
                }
                request => log(LogCategory::Dma, LogLevel::Debug, || {
                    format!(
                        "HDMA: {:?} {:04X} -> {:04X}",
                        request,
                        self.hdma.source(),
                        self.hdma.destination()
                    )
                }),
            },
            REG_BCPS => self.bg_colors.write_index(val),
            REG_BCPD => self.bg_colors.write_data(val),
            REG_OCPS => self.obj_colors.write_index(val),
            REG_OCPD => self.obj_colors.write_data(val),
            _ => {}
        }
    }

    fn write_vram(&mut self, addr: u16, val: u8) {
        let bank = self.vram_bank();
        let offset = (addr - VRAM_START) as usize;
        self.vram[bank][offset] = val;
        if addr > TILE_DATA_END {
            return;
        }
        for event in self.tiles.decode_write(bank, offset, &self.vram[bank]) {
            if let Some(observer) = self.observer.as_mut() {
                observer.tile_decoded(&event);
            }
        }
    }

    /// Store one OAM byte (`index` 0-159); used by OAM DMA as well.
    pub fn write_oam(&mut self, index: usize, val: u8) {
        if let Some(slot) = self.oam.get_mut(index) {
            *slot = val;
            self.queue(PendingUpdate::RefreshSprites);
        }
    }

    fn queue(&mut self, update: PendingUpdate) {
        let coalesce = !matches!(update, PendingUpdate::GeneralDma { .. });
        if coalesce && self.pending.contains(&update) {
            return;
        }
        self.pending.push_back(update);
    }

    fn apply_pending<H: PpuHost>(&mut self, host: &mut H) {
        while let Some(update) = self.pending.pop_front() {
            match update {
                PendingUpdate::RefreshSprites => {
                    self.sprites.refresh(&self.oam, self.regs.sprite_height());
                }
                PendingUpdate::CompareLyc => self.compare_lyc(host),
                PendingUpdate::GeneralDma { blocks } => self.run_general_dma(blocks, host),
            }
        }
    }

    fn run_general_dma<H: PpuHost>(&mut self, blocks: u8, host: &mut H) {
        log(LogCategory::Dma, LogLevel::Debug, || {
            format!(
                "HDMA: general {} bytes {:04X} -> {:04X}",
                blocks as u16 * BLOCK_BYTES,
                self.hdma.source(),
                self.hdma.destination()
            )
        });
        for _ in 0..blocks {
            self.copy_dma_block(host);
        }
        self.hdma.complete();
    }

    fn copy_dma_block<H: PpuHost>(&mut self, host: &H) {
        let src = self.hdma.source();
        let dst = self.hdma.destination();
        for i in 0..BLOCK_BYTES {
            let byte = host.read(src.wrapping_add(i));
            self.write_vram(dst + i, byte);
        }
        self.hdma.advance();
    }

    /// Composite the current scanline into the screen.
    fn render_scanline(&mut self) {
        let ly = self.regs.ly;
        let ctx = LineContext {
            regs: &self.regs,
            vram: &self.vram,
            tiles: &self.tiles,
            dmg: &self.dmg,
            bg_colors: &self.bg_colors,
            obj_colors: &self.obj_colors,
            sprites: &self.sprites,
            cgb: self.is_cgb(),
        };
        compositor::draw_background(&ctx, ly, &mut self.line);
        compositor::draw_window(&ctx, ly, &mut self.line);
        compositor::draw_sprites(&ctx, ly, &mut self.line);
        self.screen.write_row(ly as usize, &self.line.color);
    }

    /// Serialize to JSON.
    pub fn save_state(&self) -> Value {
        let snapshot = PpuSnapshot {
            model: self.config.model,
            registers: self.regs.clone(),
            mode: self.mode,
            line_cycles: self.line_cycles,
            lcd_on: self.lcd_on,
            frame_count: self.frame_count,
            vram: self.vram.iter().map(|bank| bank.to_vec()).collect(),
            oam: self.oam.to_vec(),
            bg_colors: self.bg_colors.clone(),
            obj_colors: self.obj_colors.clone(),
            hdma: self.hdma.clone(),
        };
        serde_json::to_value(snapshot).unwrap_or(Value::Null)
    }

    /// Restore from [`save_state`](Self::save_state) output and rebuild every
    /// decoded cache. Pending register effects are discarded.
    pub fn load_state(&mut self, state: &Value) -> Result<(), GbError> {
        let snapshot: PpuSnapshot = serde_json::from_value(state.clone())
            .map_err(|e| GbError::InvalidSaveState(e.to_string()))?;

        if snapshot.vram.len() != 2 {
            return Err(GbError::InvalidSaveState(format!(
                "expected 2 VRAM banks, got {}",
                snapshot.vram.len()
            )));
        }
        for bank in &snapshot.vram {
            check_size(VRAM_SIZE, bank.len())?;
        }
        check_size(OAM_SIZE, snapshot.oam.len())?;
        timing::check_timing(
            snapshot.mode,
            snapshot.registers.ly,
            snapshot.line_cycles,
            snapshot.lcd_on,
        )
        .map_err(GbError::InvalidSaveState)?;

        for (dst, src) in self.vram.iter_mut().zip(&snapshot.vram) {
            dst.copy_from_slice(src);
        }
        self.oam.copy_from_slice(&snapshot.oam);
        self.config.model = snapshot.model;
        self.regs = snapshot.registers;
        self.set_mode(snapshot.mode);
        self.line_cycles = snapshot.line_cycles;
        self.lcd_on = snapshot.lcd_on;
        self.frame_count = snapshot.frame_count;
        self.bg_colors = snapshot.bg_colors;
        self.obj_colors = snapshot.obj_colors;
        self.hdma = snapshot.hdma;

        self.bg_colors.rebuild();
        self.obj_colors.rebuild();
        for bank in 0..2 {
            self.tiles.rebuild(bank, &self.vram[bank]);
        }
        self.sprites.refresh(&self.oam, self.regs.sprite_height());
        self.dmg.set_bgp(self.regs.bgp);
        self.dmg.set_obp(0, self.regs.obp0);
        self.dmg.set_obp(1, self.regs.obp1);
        self.pending.clear();

        log(LogCategory::PPU, LogLevel::Info, || {
            format!(
                "PPU: state loaded ({:?}, LY={}, frame {})",
                self.config.model, self.regs.ly, self.frame_count
            )
        });
        Ok(())
    }

    /// Timing and DMA status for debuggers.
    pub fn debug_state(&self) -> Value {
        json!({
            "model": format!("{:?}", self.config.model),
            "mode": format!("{:?}", self.mode),
            "ly": self.regs.ly,
            "lyc": self.regs.lyc,
            "line_cycles": self.line_cycles,
            "lcd_on": self.lcd_on,
            "lcdc": self.regs.lcdc,
            "stat": self.read(REG_STAT),
            "frame_count": self.frame_count,
            "hdma_active": self.hdma.is_active(),
            "hdma_remaining": self.hdma.remaining(),
            "pending_updates": self.pending.len(),
        })
    }
}

fn check_size(expected: usize, actual: usize) -> Result<(), GbError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GbError::SnapshotSize { expected, actual })
    }
}
