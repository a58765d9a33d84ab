//! Reusable PPU (Picture Processing Unit) components for tile-based video systems.
//!
//! The Game Boy crate builds its tile cache and palette tables on top of
//! these pieces; anything specific to one machine's registers stays in that
//! machine's crate.

pub mod palette;
pub mod tile;

pub use palette::{IndexedPalette, RamPalette};
pub use tile::{decode_2bpp_row, flip_row, TileRow, TILE_BYTES, TILE_SIZE};
