//! Decoded tile cache.
//!
//! VRAM tile data is kept pre-decoded so the compositor never touches raw
//! bitplanes. The two addressing windows overlap in 0x8800-0x8FFF and are
//! cached separately, each row re-decoded whenever either of its two bytes
//! is written.

use emu_core::ppu::{decode_2bpp_row, TileRow, TILE_BYTES, TILE_SIZE};

use super::registers::VRAM_SIZE;

const TILES_PER_SET: usize = 256;
const SET_BYTES: usize = TILES_PER_SET * TILE_BYTES;
/// VRAM offset of the signed-addressing window (0x8800).
const SIGNED_BASE: usize = 0x0800;

/// One of the two overlapping tile windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSet {
    /// 0x8000-0x8FFF, indexed directly by the map byte.
    Unsigned,
    /// 0x8800-0x97FF, indexed by the map byte read as signed around 0x9000.
    Signed,
}

impl TileSet {
    /// Cache slot holding the tile a map byte refers to.
    ///
    /// The signed window stores slot 0 at 0x8800, so map bytes 0-127 land
    /// in slots 128-255 and 128-255 land in 0-127.
    #[inline]
    pub fn slot(self, map_index: u8) -> usize {
        match self {
            TileSet::Unsigned => map_index as usize,
            TileSet::Signed => (map_index ^ 0x80) as usize,
        }
    }
}

/// An 8x8 tile as raw color indices.
pub type Tile = [TileRow; TILE_SIZE];

/// Row decoded after a VRAM write, handed to a [`TileObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileDecodeEvent {
    pub set: TileSet,
    pub bank: usize,
    /// Cache slot (not the map byte)
    pub slot: usize,
    pub row: usize,
    pub pixels: TileRow,
}

/// Hook for debugger-style tile viewers.
pub trait TileObserver: Send {
    fn tile_decoded(&mut self, event: &TileDecodeEvent);
}

/// Decoded tiles for both windows, one copy per VRAM bank.
pub struct TileCache {
    unsigned: Vec<Tile>,
    signed: Vec<Tile>,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache {
    pub fn new() -> Self {
        Self {
            unsigned: vec![[[0; TILE_SIZE]; TILE_SIZE]; TILES_PER_SET * 2],
            signed: vec![[[0; TILE_SIZE]; TILE_SIZE]; TILES_PER_SET * 2],
        }
    }

    /// Re-decode the row containing `offset` (relative to 0x8000) from the
    /// bank's bytes. Returns one event per window the row belongs to.
    pub fn decode_write(
        &mut self,
        bank: usize,
        offset: usize,
        bank_bytes: &[u8; VRAM_SIZE],
    ) -> impl Iterator<Item = TileDecodeEvent> {
        let mut events = [None, None];
        if offset >= SET_BYTES + SIGNED_BASE {
            return events.into_iter().flatten();
        }

        let lo = bank_bytes[offset & !1];
        let hi = bank_bytes[offset | 1];
        let pixels = decode_2bpp_row(lo, hi);
        let row = (offset % TILE_BYTES) / 2;

        if offset < SET_BYTES {
            let slot = offset / TILE_BYTES;
            self.unsigned[bank * TILES_PER_SET + slot][row] = pixels;
            events[0] = Some(TileDecodeEvent {
                set: TileSet::Unsigned,
                bank,
                slot,
                row,
                pixels,
            });
        }
        if offset >= SIGNED_BASE {
            let slot = (offset - SIGNED_BASE) / TILE_BYTES;
            self.signed[bank * TILES_PER_SET + slot][row] = pixels;
            events[1] = Some(TileDecodeEvent {
                set: TileSet::Signed,
                bank,
                slot,
                row,
                pixels,
            });
        }

        events.into_iter().flatten()
    }

    /// Rebuild every tile of a bank, used after loading a snapshot.
    pub fn rebuild(&mut self, bank: usize, bank_bytes: &[u8; VRAM_SIZE]) {
        for offset in (0..SET_BYTES + SIGNED_BASE).step_by(2) {
            self.decode_write(bank, offset, bank_bytes).for_each(drop);
        }
    }

    /// Row of the tile a background/window map byte refers to.
    #[inline]
    pub fn map_row(&self, set: TileSet, bank: usize, map_index: u8, row: usize) -> TileRow {
        let tiles = match set {
            TileSet::Unsigned => &self.unsigned,
            TileSet::Signed => &self.signed,
        };
        tiles[bank * TILES_PER_SET + set.slot(map_index)][row]
    }

    /// Sprites always address the unsigned window.
    #[inline]
    pub fn sprite_row(&self, bank: usize, tile: u8, row: usize) -> TileRow {
        self.unsigned[bank * TILES_PER_SET + tile as usize][row]
    }

    pub fn tile(&self, set: TileSet, bank: usize, slot: usize) -> &Tile {
        match set {
            TileSet::Unsigned => &self.unsigned[bank * TILES_PER_SET + slot],
            TileSet::Signed => &self.signed[bank * TILES_PER_SET + slot],
        }
    }
}
