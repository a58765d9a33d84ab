//! DMG shade mapping and CGB color palette memory.

use emu_core::graphics::ColorOps;
use emu_core::ppu::{IndexedPalette, RamPalette};
use serde::{Deserialize, Serialize};

/// Default DMG shades, lightest to darkest.
pub const DEFAULT_SHADES: [u32; 4] = [0xFFFFFFFF, 0xFFC0C0C0, 0xFF606060, 0xFF000000];

/// Decode a BGP/OBP register into four shade indices.
#[inline]
fn unpack_map(reg: u8) -> [u8; 4] {
    [reg & 3, (reg >> 2) & 3, (reg >> 4) & 3, (reg >> 6) & 3]
}

/// Monochrome palette state: a fixed shade table plus the three
/// register-driven index maps.
#[derive(Debug, Clone)]
pub struct DmgPalettes {
    shades: RamPalette,
    bg: [u8; 4],
    obj: [[u8; 4]; 2],
}

impl DmgPalettes {
    pub fn new(shades: [u32; 4]) -> Self {
        Self {
            shades: RamPalette::from_colors(shades.to_vec()),
            bg: unpack_map(0xFC),
            obj: [unpack_map(0xFF); 2],
        }
    }

    pub fn set_bgp(&mut self, val: u8) {
        self.bg = unpack_map(val);
    }

    /// `which` is 0 for OBP0, 1 for OBP1.
    pub fn set_obp(&mut self, which: usize, val: u8) {
        self.obj[which & 1] = unpack_map(val);
    }

    #[inline]
    pub fn bg_color(&self, raw: u8) -> u32 {
        self.shades.get_color(self.bg[(raw & 3) as usize] as usize)
    }

    #[inline]
    pub fn obj_color(&self, which: usize, raw: u8) -> u32 {
        self.shades.get_color(self.obj[which & 1][(raw & 3) as usize] as usize)
    }
}

const PALETTE_BYTES: usize = 64;
const PALETTE_COLORS: usize = PALETTE_BYTES / 2;
const AUTO_INCREMENT: u8 = 0x80;
const INDEX_MASK: u8 = 0x3F;

/// One CGB palette memory (background or object): 8 palettes of 4 RGB555
/// colors, reached through an index register and a data port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorPaletteRam {
    /// Index register as written: bits 0-5 byte index, bit 7 auto-increment.
    index: u8,
    raw: [u16; PALETTE_COLORS],
    #[serde(skip, default = "blank_colors")]
    colors: [u32; PALETTE_COLORS],
}

fn blank_colors() -> [u32; PALETTE_COLORS] {
    [0xFF000000; PALETTE_COLORS]
}

impl ColorPaletteRam {
    /// Every entry starts at `initial` (RGB555).
    pub fn new(initial: u16) -> Self {
        let mut ram = Self {
            index: 0,
            raw: [initial & 0x7FFF; PALETTE_COLORS],
            colors: blank_colors(),
        };
        ram.rebuild();
        ram
    }

    /// Recompute display colors from the stored RGB555 values.
    pub fn rebuild(&mut self) {
        for (color, &raw) in self.colors.iter_mut().zip(self.raw.iter()) {
            *color = ColorOps::from_rgb555(raw);
        }
    }

    pub fn write_index(&mut self, val: u8) {
        self.index = val & (AUTO_INCREMENT | INDEX_MASK);
    }

    /// Bit 6 is unused and reads back set.
    pub fn read_index(&self) -> u8 {
        self.index | 0x40
    }

    /// Store one byte at the current index. Bit 0 of the index selects the
    /// low or high half of the color; bit 7 of a high byte is dropped.
    pub fn write_data(&mut self, val: u8) {
        let byte = (self.index & INDEX_MASK) as usize;
        let slot = byte / 2;
        let current = self.raw[slot];
        self.raw[slot] = if byte & 1 == 0 {
            (current & 0x7F00) | val as u16
        } else {
            (current & 0x00FF) | (((val & 0x7F) as u16) << 8)
        };
        self.colors[slot] = ColorOps::from_rgb555(self.raw[slot]);

        if self.index & AUTO_INCREMENT != 0 {
            let next = ((self.index & INDEX_MASK) + 1) & INDEX_MASK;
            self.index = AUTO_INCREMENT | next;
        }
    }

    /// Reading never advances the index.
    pub fn read_data(&self) -> u8 {
        let byte = (self.index & INDEX_MASK) as usize;
        let raw = self.raw[byte / 2];
        if byte & 1 == 0 {
            raw as u8
        } else {
            (raw >> 8) as u8
        }
    }

    #[inline]
    pub fn color(&self, palette: u8, raw: u8) -> u32 {
        self.colors[((palette & 7) as usize) * 4 + (raw & 3) as usize]
    }

    pub fn raw_color(&self, palette: u8, raw: u8) -> u16 {
        self.raw[((palette & 7) as usize) * 4 + (raw & 3) as usize]
    }
}

impl IndexedPalette for ColorPaletteRam {
    fn get_color(&self, index: usize) -> u32 {
        self.colors.get(index).copied().unwrap_or(0xFF000000)
    }

    /// Stores the nearest RGB555 value so the data port reads it back.
    fn set_color(&mut self, index: usize, color: u32) {
        if index < PALETTE_COLORS {
            let r = (ColorOps::red(color) >> 3) as u16;
            let g = (ColorOps::green(color) >> 3) as u16;
            let b = (ColorOps::blue(color) >> 3) as u16;
            self.raw[index] = r | (g << 5) | (b << 10);
            self.colors[index] = ColorOps::from_rgb555(self.raw[index]);
        }
    }

    fn len(&self) -> usize {
        PALETTE_COLORS
    }
}
