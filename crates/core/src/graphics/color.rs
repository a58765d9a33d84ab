//! Color operation utilities for graphics rendering
//!
//! Colors are in ARGB8888 format (0xAARRGGBB).

/// Color operation utilities
pub struct ColorOps;

impl ColorOps {
    /// Extract red channel from ARGB color
    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    /// Extract green channel from ARGB color
    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    /// Extract blue channel from ARGB color
    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    /// Extract alpha channel from ARGB color
    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Convert a 15-bit BGR555 value (bits 0-4 red, 5-9 green, 10-14 blue)
    /// to opaque ARGB.
    ///
    /// Each 5-bit channel is multiplied by 8. This is a linear approximation;
    /// the real LCD response curve is not modelled.
    ///
    /// ```
    /// use emu_core::graphics::ColorOps;
    ///
    /// assert_eq!(ColorOps::from_rgb555(0x7FFF), 0xFFF8F8F8);
    /// assert_eq!(ColorOps::from_rgb555(0x001F), 0xFFF80000);
    /// ```
    #[inline]
    pub fn from_rgb555(raw: u16) -> u32 {
        let r = (raw & 0x1F) as u8;
        let g = ((raw >> 5) & 0x1F) as u8;
        let b = ((raw >> 10) & 0x1F) as u8;
        Self::from_rgb(r * 8, g * 8, b * 8)
    }
}
