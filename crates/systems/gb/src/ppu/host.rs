//! The seam between the PPU and the rest of the machine.

use super::screen::Screen;

/// Interrupt lines the PPU can raise into the interrupt flag register (IF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// IF bit 0
    VBlank,
    /// IF bit 1
    LcdStat,
}

impl Interrupt {
    /// Bit mask of this interrupt in IF/IE.
    pub fn mask(self) -> u8 {
        match self {
            Interrupt::VBlank => 0x01,
            Interrupt::LcdStat => 0x02,
        }
    }
}

/// Everything the PPU needs from outside its own address ranges.
///
/// The instruction interpreter's memory side implements this and passes
/// itself to [`Ppu::step`](super::Ppu::step). Taking it by `&mut` for the
/// duration of a step keeps every other writer out until the step returns.
pub trait PpuHost {
    /// Read a byte from system memory (VRAM DMA source).
    fn read(&self, addr: u16) -> u8;

    /// Set an interrupt-pending bit. Dispatch and acknowledgement belong to
    /// the interpreter.
    fn request_interrupt(&mut self, interrupt: Interrupt);

    /// Receive the finished frame at VBlank entry.
    ///
    /// The borrow ends when the call returns; implementations copy what they
    /// need.
    fn present(&mut self, _screen: &Screen) {}
}
