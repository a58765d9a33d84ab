//! The PPU's output surface.

use emu_core::types::Frame;

/// Visible LCD width.
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;
/// Width of a composited scanline: one full 32-tile map row.
pub const LINE_WIDTH: usize = 256;

/// 256x144 ARGB pixels; columns 0-159 are what the LCD shows.
#[derive(Debug, Clone)]
pub struct Screen {
    pixels: Vec<u32>,
}

impl Screen {
    pub fn new(fill: u32) -> Self {
        Self {
            pixels: vec![fill; LINE_WIDTH * SCREEN_HEIGHT],
        }
    }

    pub fn row(&self, y: usize) -> &[u32] {
        &self.pixels[y * LINE_WIDTH..(y + 1) * LINE_WIDTH]
    }

    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * LINE_WIDTH + x]
    }

    pub(crate) fn write_row(&mut self, y: usize, line: &[u32; LINE_WIDTH]) {
        self.pixels[y * LINE_WIDTH..(y + 1) * LINE_WIDTH].copy_from_slice(line);
    }

    /// Copy out as a frame, either the visible 160 columns or all 256.
    pub fn to_frame(&self, full_width: bool) -> Frame {
        let width = if full_width { LINE_WIDTH } else { SCREEN_WIDTH };
        let mut frame = Frame::new(width as u32, SCREEN_HEIGHT as u32);
        for (y, out) in frame.pixels.chunks_exact_mut(width).enumerate() {
            out.copy_from_slice(&self.row(y)[..width]);
        }
        frame
    }
}
