//! PPU register addresses, bit layouts and the register file.

use serde::{Deserialize, Serialize};

pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
pub const VRAM_SIZE: usize = 0x2000;
/// End of tile data; everything above up to `VRAM_END` is tile maps.
pub const TILE_DATA_END: u16 = 0x97FF;
pub const OAM_START: u16 = 0xFE00;
pub const OAM_END: u16 = 0xFE9F;
pub const OAM_SIZE: usize = 0xA0;

pub const REG_LCDC: u16 = 0xFF40;
pub const REG_STAT: u16 = 0xFF41;
pub const REG_SCY: u16 = 0xFF42;
pub const REG_SCX: u16 = 0xFF43;
pub const REG_LY: u16 = 0xFF44;
pub const REG_LYC: u16 = 0xFF45;
pub const REG_DMA: u16 = 0xFF46;
pub const REG_BGP: u16 = 0xFF47;
pub const REG_OBP0: u16 = 0xFF48;
pub const REG_OBP1: u16 = 0xFF49;
pub const REG_WY: u16 = 0xFF4A;
pub const REG_WX: u16 = 0xFF4B;
pub const REG_VBK: u16 = 0xFF4F;
pub const REG_HDMA1: u16 = 0xFF51;
pub const REG_HDMA2: u16 = 0xFF52;
pub const REG_HDMA3: u16 = 0xFF53;
pub const REG_HDMA4: u16 = 0xFF54;
pub const REG_HDMA5: u16 = 0xFF55;
pub const REG_BCPS: u16 = 0xFF68;
pub const REG_BCPD: u16 = 0xFF69;
pub const REG_OCPS: u16 = 0xFF6A;
pub const REG_OCPD: u16 = 0xFF6B;

// LCDC bits
pub const LCDC_ENABLE: u8 = 0x80;
pub const LCDC_WIN_TILEMAP: u8 = 0x40;
pub const LCDC_WIN_ENABLE: u8 = 0x20;
pub const LCDC_BG_WIN_TILES: u8 = 0x10;
pub const LCDC_BG_TILEMAP: u8 = 0x08;
pub const LCDC_OBJ_SIZE: u8 = 0x04;
pub const LCDC_OBJ_ENABLE: u8 = 0x02;
/// DMG: background/window enable. CGB: background/window master priority.
pub const LCDC_BG_WIN_ENABLE: u8 = 0x01;

// STAT bits
pub const STAT_MODE_MASK: u8 = 0x03;
pub const STAT_COINCIDENCE: u8 = 0x04;
pub const STAT_HBLANK_INT: u8 = 0x08;
pub const STAT_VBLANK_INT: u8 = 0x10;
pub const STAT_OAM_INT: u8 = 0x20;
pub const STAT_LYC_INT: u8 = 0x40;
/// Bits a program may write; mode and coincidence are owned by the PPU.
pub const STAT_WRITABLE: u8 = 0x78;

/// Tile map offsets within VRAM.
pub const TILEMAP_LOW: usize = 0x1800;
pub const TILEMAP_HIGH: usize = 0x1C00;

/// CPU-visible PPU registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub lcdc: u8,
    pub stat: u8,
    pub scy: u8,
    pub scx: u8,
    pub ly: u8,
    pub lyc: u8,
    pub bgp: u8,
    pub obp0: u8,
    pub obp1: u8,
    pub wy: u8,
    pub wx: u8,
    /// VRAM bank select (CGB only, bit 0)
    pub vbk: u8,
}

impl Default for Registers {
    /// Register state left behind by the boot ROM.
    fn default() -> Self {
        Self {
            lcdc: 0x91,
            stat: STAT_COINCIDENCE | 0x02,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0xFF,
            obp1: 0xFF,
            wy: 0,
            wx: 0,
            vbk: 0,
        }
    }
}

impl Registers {
    #[inline]
    pub fn lcdc_bit(&self, bit: u8) -> bool {
        self.lcdc & bit != 0
    }

    #[inline]
    pub fn stat_bit(&self, bit: u8) -> bool {
        self.stat & bit != 0
    }

    /// Sprite height in pixels selected by LCDC bit 2.
    #[inline]
    pub fn sprite_height(&self) -> u8 {
        if self.lcdc_bit(LCDC_OBJ_SIZE) {
            16
        } else {
            8
        }
    }

    /// Offset of the background tile map within VRAM.
    #[inline]
    pub fn bg_tilemap(&self) -> usize {
        if self.lcdc_bit(LCDC_BG_TILEMAP) {
            TILEMAP_HIGH
        } else {
            TILEMAP_LOW
        }
    }

    /// Offset of the window tile map within VRAM.
    #[inline]
    pub fn window_tilemap(&self) -> usize {
        if self.lcdc_bit(LCDC_WIN_TILEMAP) {
            TILEMAP_HIGH
        } else {
            TILEMAP_LOW
        }
    }
}
