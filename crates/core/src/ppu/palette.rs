//! Generic indexed palette system for retro video hardware.
//!
//! Pixel values coming out of tile decoding are indices; a palette maps
//! them to 32-bit ARGB display colors (0xAARRGGBB).
//!
//! - Game Boy: a 4-entry shade table selected through BGP/OBP0/OBP1
//! - Game Boy Color: 8 background + 8 sprite palettes of 4 RGB555 colors

/// Maps color indices to ARGB values.
pub trait IndexedPalette {
    /// Get the ARGB color for a palette index.
    fn get_color(&self, index: usize) -> u32;

    /// Set the ARGB color for a palette index.
    fn set_color(&mut self, index: usize, color: u32);

    /// Get the number of colors in this palette.
    fn len(&self) -> usize;

    /// Check if the palette is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A simple RAM-based palette storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamPalette {
    colors: Vec<u32>,
}

impl RamPalette {
    /// Create a new palette with the specified number of colors.
    pub fn new(size: usize) -> Self {
        Self {
            colors: vec![0xFF000000; size], // Default to opaque black
        }
    }

    /// Create a palette from a list of colors.
    pub fn from_colors(colors: Vec<u32>) -> Self {
        Self { colors }
    }

    /// Get a slice of all colors.
    pub fn colors(&self) -> &[u32] {
        &self.colors
    }
}

impl IndexedPalette for RamPalette {
    fn get_color(&self, index: usize) -> u32 {
        self.colors.get(index).copied().unwrap_or(0xFF000000)
    }

    fn set_color(&mut self, index: usize, color: u32) {
        if let Some(slot) = self.colors.get_mut(index) {
            *slot = color;
        }
    }

    fn len(&self) -> usize {
        self.colors.len()
    }
}
