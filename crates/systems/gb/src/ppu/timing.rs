//! Mode timing: the per-scanline state machine driven by `Ppu::step`.

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use super::host::{Interrupt, PpuHost};
use super::registers::*;
use super::Ppu;

pub const CYCLES_PER_LINE: u32 = 456;
/// Cycle within a visible line where pixel transfer begins.
pub const OAM_SEARCH_END: u32 = 80;
/// Cycle within a visible line where HBlank begins.
pub const PIXEL_TRANSFER_END: u32 = 252;
pub const VISIBLE_LINES: u8 = 144;
pub const TOTAL_LINES: u8 = 154;
pub const CYCLES_PER_FRAME: u32 = CYCLES_PER_LINE * TOTAL_LINES as u32;
/// Largest single step accepted; anything bigger is a broken caller.
pub const MAX_STEP_CYCLES: u32 = CYCLES_PER_FRAME * 16;

/// PPU mode as reported in STAT bits 0-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    HBlank,
    VBlank,
    OamSearch,
    PixelTransfer,
}

impl Mode {
    pub fn stat_bits(self) -> u8 {
        match self {
            Mode::HBlank => 0,
            Mode::VBlank => 1,
            Mode::OamSearch => 2,
            Mode::PixelTransfer => 3,
        }
    }

    /// Line cycle at which this mode begins.
    fn start_cycle(self) -> u32 {
        match self {
            Mode::OamSearch | Mode::VBlank => 0,
            Mode::PixelTransfer => OAM_SEARCH_END,
            Mode::HBlank => PIXEL_TRANSFER_END,
        }
    }

    /// Line cycle at which this mode ends.
    fn end_cycle(self) -> u32 {
        match self {
            Mode::OamSearch => OAM_SEARCH_END,
            Mode::PixelTransfer => PIXEL_TRANSFER_END,
            Mode::HBlank | Mode::VBlank => CYCLES_PER_LINE,
        }
    }

    /// STAT enable bit for the interrupt raised on entry, if any.
    fn stat_source(self) -> Option<u8> {
        match self {
            Mode::HBlank => Some(STAT_HBLANK_INT),
            Mode::VBlank => Some(STAT_VBLANK_INT),
            Mode::OamSearch => Some(STAT_OAM_INT),
            Mode::PixelTransfer => None,
        }
    }
}

/// Check that a restored mode, line and cycle could have come out of
/// `Ppu::step`. With the LCD off the machine idles in HBlank on line 0.
pub(super) fn check_timing(
    mode: Mode,
    ly: u8,
    line_cycles: u32,
    lcd_on: bool,
) -> Result<(), String> {
    if ly >= TOTAL_LINES {
        return Err(format!("LY {} is past the last line", ly));
    }
    if !lcd_on {
        return if mode == Mode::HBlank && ly == 0 {
            Ok(())
        } else {
            Err(format!("LCD off but {:?} on LY {}", mode, ly))
        };
    }
    if (mode == Mode::VBlank) != (ly >= VISIBLE_LINES) {
        return Err(format!("{:?} on LY {}", mode, ly));
    }
    if !(mode.start_cycle()..mode.end_cycle()).contains(&line_cycles) {
        return Err(format!("line cycle {} outside {:?}", line_cycles, mode));
    }
    Ok(())
}

impl Ppu {
    /// Advance by `cycles` machine cycles.
    ///
    /// Queued register side effects are applied first. Steps may be any
    /// size; every mode boundary crossed inside the step is processed in
    /// order.
    ///
    /// # Panics
    ///
    /// Panics if `cycles` exceeds [`MAX_STEP_CYCLES`].
    pub fn step<H: PpuHost>(&mut self, cycles: u32, host: &mut H) {
        assert!(
            cycles <= MAX_STEP_CYCLES,
            "PPU step of {} cycles exceeds the {} cycle limit",
            cycles,
            MAX_STEP_CYCLES
        );
        self.apply_pending(host);

        if !self.lcd_on {
            if !self.regs.lcdc_bit(LCDC_ENABLE) {
                return;
            }
            self.power_on_lcd(host);
        }

        let mut remaining = cycles;
        while remaining > 0 {
            if self.mode == Mode::VBlank && !self.regs.lcdc_bit(LCDC_ENABLE) {
                self.power_off_lcd(host);
                return;
            }
            let boundary = self.mode.end_cycle();
            let advance = remaining.min(boundary - self.line_cycles);
            self.line_cycles += advance;
            remaining -= advance;
            if self.line_cycles == boundary {
                self.finish_mode(host);
            }
        }
    }

    fn finish_mode<H: PpuHost>(&mut self, host: &mut H) {
        match self.mode {
            Mode::OamSearch => self.enter_mode(Mode::PixelTransfer, host),
            Mode::PixelTransfer => {
                self.render_scanline();
                self.set_mode(Mode::HBlank);
                self.service_hblank_dma(host);
                self.raise_entry_stat(Mode::HBlank, host);
            }
            Mode::HBlank => {
                self.line_cycles = 0;
                self.regs.ly += 1;
                self.compare_lyc(host);
                if self.regs.ly == VISIBLE_LINES {
                    self.enter_mode(Mode::VBlank, host);
                } else {
                    self.enter_mode(Mode::OamSearch, host);
                }
            }
            Mode::VBlank => {
                self.line_cycles = 0;
                self.regs.ly += 1;
                if self.regs.ly == TOTAL_LINES {
                    self.regs.ly = 0;
                    self.compare_lyc(host);
                    self.enter_mode(Mode::OamSearch, host);
                } else {
                    self.compare_lyc(host);
                }
            }
        }
    }

    /// Switch modes and raise whatever the new mode raises on entry.
    fn enter_mode<H: PpuHost>(&mut self, mode: Mode, host: &mut H) {
        self.set_mode(mode);

        if mode == Mode::VBlank {
            self.frame_count += 1;
            log(LogCategory::Interrupts, LogLevel::Trace, || {
                format!("PPU: VBlank interrupt (frame {})", self.frame_count)
            });
            host.request_interrupt(Interrupt::VBlank);
            host.present(&self.screen);
        }
        self.raise_entry_stat(mode, host);
    }

    fn raise_entry_stat<H: PpuHost>(&mut self, mode: Mode, host: &mut H) {
        if let Some(source) = mode.stat_source() {
            if self.regs.stat_bit(source) {
                self.raise_stat(host, mode);
            }
        }
    }

    /// Update STAT's mode bits without side effects.
    pub(super) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.regs.stat = (self.regs.stat & !STAT_MODE_MASK) | mode.stat_bits();
    }

    fn raise_stat<H: PpuHost, D: std::fmt::Debug>(&self, host: &mut H, reason: D) {
        log(LogCategory::Interrupts, LogLevel::Trace, || {
            format!("PPU: STAT interrupt ({:?}) at LY={}", reason, self.regs.ly)
        });
        host.request_interrupt(Interrupt::LcdStat);
    }

    /// Update the coincidence flag; a rising edge raises STAT when enabled.
    pub(super) fn compare_lyc<H: PpuHost>(&mut self, host: &mut H) {
        let was_set = self.regs.stat_bit(STAT_COINCIDENCE);
        if self.regs.ly == self.regs.lyc {
            self.regs.stat |= STAT_COINCIDENCE;
            if !was_set && self.regs.stat_bit(STAT_LYC_INT) {
                self.raise_stat(host, "LYC");
            }
        } else {
            self.regs.stat &= !STAT_COINCIDENCE;
        }
    }

    fn power_off_lcd<H: PpuHost>(&mut self, host: &mut H) {
        log(LogCategory::PPU, LogLevel::Debug, || {
            format!("PPU: LCD off after {} frames", self.frame_count)
        });
        self.lcd_on = false;
        self.regs.ly = 0;
        self.line_cycles = 0;
        self.set_mode(Mode::HBlank);
        self.compare_lyc(host);
    }

    fn power_on_lcd<H: PpuHost>(&mut self, host: &mut H) {
        log(LogCategory::PPU, LogLevel::Debug, || "PPU: LCD on".to_string());
        self.lcd_on = true;
        self.line_cycles = 0;
        self.compare_lyc(host);
        self.enter_mode(Mode::OamSearch, host);
    }

    fn service_hblank_dma<H: PpuHost>(&mut self, host: &mut H) {
        if !self.hdma.is_active() {
            return;
        }
        self.copy_dma_block(host);
        self.hdma.finish_block();
        log(LogCategory::Dma, LogLevel::Trace, || {
            format!(
                "HDMA: HBlank block at LY={}, {} left",
                self.regs.ly,
                self.hdma.remaining()
            )
        });
    }
}
