//! PPU renderer: host-side framebuffer fed from the PPU at VBlank.
//!
//! ```text
//! Ppu (state, compositing) -> PpuHost::present -> PpuRenderer -> Frame
//! ```
//!
//! The PPU composites every scanline itself; a renderer only decides what
//! part of the 256-pixel-wide screen becomes the presented frame.

use emu_core::renderer::Renderer;
use emu_core::types::Frame;

use crate::ppu::{Screen, LINE_WIDTH, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Renderer that can accept a finished PPU screen.
pub trait PpuRenderer: Renderer {
    fn present(&mut self, screen: &Screen);
}

/// Copies the screen into a `Frame` on the CPU.
pub struct SoftwarePpuRenderer {
    framebuffer: Frame,
    full_width: bool,
}

impl SoftwarePpuRenderer {
    /// `full_width` keeps all 256 composited columns.
    pub fn new(full_width: bool) -> Self {
        let width = if full_width { LINE_WIDTH } else { SCREEN_WIDTH };
        Self {
            framebuffer: Frame::new(width as u32, SCREEN_HEIGHT as u32),
            full_width,
        }
    }
}

impl Default for SoftwarePpuRenderer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Renderer for SoftwarePpuRenderer {
    fn get_frame(&self) -> &Frame {
        &self.framebuffer
    }

    fn clear(&mut self, color: u32) {
        self.framebuffer.pixels.fill(color);
    }

    fn reset(&mut self) {
        self.clear(0xFF000000);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Frame::new(width, height);
    }

    fn name(&self) -> &str {
        "Game Boy Software Renderer"
    }
}

impl PpuRenderer for SoftwarePpuRenderer {
    fn present(&mut self, screen: &Screen) {
        self.framebuffer = screen.to_frame(self.full_width);
    }
}
