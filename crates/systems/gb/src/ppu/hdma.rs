//! CGB VRAM DMA registers (HDMA1-HDMA5).
//!
//! Only register state lives here; the copy itself runs in the PPU because
//! it needs both the host (source) and VRAM (destination).

use serde::{Deserialize, Serialize};

pub const BLOCK_BYTES: u16 = 16;

/// Effect of an HDMA5 write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaRequest {
    /// Copy this many blocks right away.
    General { blocks: u8 },
    /// One block per HBlank from now on.
    HBlankStarted { blocks: u8 },
    /// A running HBlank transfer was stopped.
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hdma {
    src_hi: u8,
    src_lo: u8,
    dst_hi: u8,
    dst_lo: u8,
    /// Blocks left in an HBlank transfer
    remaining: u8,
    active: bool,
    /// HDMA5 value read back while idle
    idle_readback: u8,
}

impl Hdma {
    pub fn new() -> Self {
        Self {
            idle_readback: 0xFF,
            ..Self::default()
        }
    }

    #[inline]
    pub fn source(&self) -> u16 {
        u16::from_be_bytes([self.src_hi, self.src_lo]) & 0xFFF0
    }

    #[inline]
    pub fn destination(&self) -> u16 {
        0x8000 | (u16::from_be_bytes([self.dst_hi, self.dst_lo]) & 0x1FF0)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn write_source_hi(&mut self, val: u8) {
        self.src_hi = val;
    }

    pub fn write_source_lo(&mut self, val: u8) {
        self.src_lo = val & 0xF0;
    }

    pub fn write_dest_hi(&mut self, val: u8) {
        self.dst_hi = val & 0x1F;
    }

    pub fn write_dest_lo(&mut self, val: u8) {
        self.dst_lo = val & 0xF0;
    }

    /// HDMA5 write.
    pub fn write_control(&mut self, val: u8) -> DmaRequest {
        let blocks = (val & 0x7F) + 1;
        if val & 0x80 != 0 {
            self.active = true;
            self.remaining = blocks;
            DmaRequest::HBlankStarted { blocks }
        } else if self.active {
            self.active = false;
            self.idle_readback = 0x80 | (self.remaining.wrapping_sub(1) & 0x7F);
            DmaRequest::Cancelled
        } else {
            DmaRequest::General { blocks }
        }
    }

    /// HDMA5 read: blocks left minus one while running, 0xFF once done.
    pub fn read_control(&self) -> u8 {
        if self.active {
            self.remaining.wrapping_sub(1) & 0x7F
        } else {
            self.idle_readback
        }
    }

    /// Step both addresses past the block just copied.
    pub fn advance(&mut self) {
        let [hi, lo] = (self.source().wrapping_add(BLOCK_BYTES)).to_be_bytes();
        self.src_hi = hi;
        self.src_lo = lo;
        let [hi, lo] = (self.destination().wrapping_add(BLOCK_BYTES) & 0x1FF0).to_be_bytes();
        self.dst_hi = hi;
        self.dst_lo = lo;
    }

    /// Count one HBlank block as copied.
    pub fn finish_block(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.complete();
        }
    }

    pub fn complete(&mut self) {
        self.active = false;
        self.remaining = 0;
        self.idle_readback = 0xFF;
    }
}
