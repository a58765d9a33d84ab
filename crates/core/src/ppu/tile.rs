//! Tile/pattern decoding utilities for 2bpp planar tile data.
//!
//! A tile is 8x8 pixels. Each row is stored as two bytes: the first holds
//! bit 0 of every pixel (low plane), the second holds bit 1 (high plane).
//! The most significant bit of each byte is the leftmost pixel.

/// Width and height of a tile in pixels.
pub const TILE_SIZE: usize = 8;

/// Bytes of backing memory per tile (2 bytes per row).
pub const TILE_BYTES: usize = 16;

/// One decoded row of palette indices (0-3), left to right.
pub type TileRow = [u8; TILE_SIZE];

/// Decode one tile row from its low and high bit-plane bytes.
///
/// # Example
///
/// ```
/// use emu_core::ppu::decode_2bpp_row;
///
/// assert_eq!(decode_2bpp_row(0xFF, 0xFF), [3; 8]);
/// assert_eq!(decode_2bpp_row(0x80, 0x00), [1, 0, 0, 0, 0, 0, 0, 0]);
/// ```
#[inline]
pub fn decode_2bpp_row(lo: u8, hi: u8) -> TileRow {
    let mut row = [0u8; TILE_SIZE];
    for (x, pixel) in row.iter_mut().enumerate() {
        let bit = 7 - x;
        *pixel = (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1);
    }
    row
}

/// Mirror a decoded row horizontally.
#[inline]
pub fn flip_row(row: TileRow) -> TileRow {
    let mut out = row;
    out.reverse();
    out
}
