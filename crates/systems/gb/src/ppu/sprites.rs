//! Sprite descriptors decoded from OAM.

use super::registers::OAM_SIZE;

pub const SPRITE_COUNT: usize = OAM_SIZE / 4;
/// Hardware limit on sprites drawn per scanline.
pub const SPRITES_PER_LINE: usize = 10;

const FLAG_PRIORITY: u8 = 0x80;
const FLAG_Y_FLIP: u8 = 0x40;
const FLAG_X_FLIP: u8 = 0x20;
const FLAG_DMG_PALETTE: u8 = 0x10;
const FLAG_VRAM_BANK: u8 = 0x08;
const FLAG_CGB_PALETTE: u8 = 0x07;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sprite {
    /// Screen Y of the top row (OAM byte 0 minus 16)
    pub y: i16,
    /// Screen X of the left column (OAM byte 1 minus 8)
    pub x: i16,
    pub tile: u8,
    pub flags: u8,
}

impl Sprite {
    fn from_oam(entry: &[u8], tall: bool) -> Self {
        let tile = if tall { entry[2] & 0xFE } else { entry[2] };
        Self {
            y: entry[0] as i16 - 16,
            x: entry[1] as i16 - 8,
            tile,
            flags: entry[3],
        }
    }

    /// Hidden behind non-zero background pixels.
    #[inline]
    pub fn behind_bg(&self) -> bool {
        self.flags & FLAG_PRIORITY != 0
    }

    #[inline]
    pub fn y_flip(&self) -> bool {
        self.flags & FLAG_Y_FLIP != 0
    }

    #[inline]
    pub fn x_flip(&self) -> bool {
        self.flags & FLAG_X_FLIP != 0
    }

    /// OBP0/OBP1 select (DMG).
    #[inline]
    pub fn dmg_palette(&self) -> usize {
        usize::from(self.flags & FLAG_DMG_PALETTE != 0)
    }

    #[inline]
    pub fn vram_bank(&self) -> usize {
        usize::from(self.flags & FLAG_VRAM_BANK != 0)
    }

    #[inline]
    pub fn cgb_palette(&self) -> u8 {
        self.flags & FLAG_CGB_PALETTE
    }

    #[inline]
    fn covers(&self, ly: u8, height: u8) -> bool {
        let ly = ly as i16;
        ly >= self.y && ly < self.y + height as i16
    }
}

/// Sprites picked for one scanline, in OAM order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineSprites {
    slots: [usize; SPRITES_PER_LINE],
    len: usize,
}

impl LineSprites {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.slots[..self.len]
    }
}

/// All 40 OAM entries, decoded.
#[derive(Debug, Clone)]
pub struct SpriteTable {
    sprites: [Sprite; SPRITE_COUNT],
    height: u8,
}

impl Default for SpriteTable {
    fn default() -> Self {
        Self {
            sprites: [Sprite::default(); SPRITE_COUNT],
            height: 8,
        }
    }
}

impl SpriteTable {
    /// Rebuild every descriptor from OAM.
    pub fn refresh(&mut self, oam: &[u8; OAM_SIZE], height: u8) {
        let tall = height == 16;
        for (sprite, entry) in self.sprites.iter_mut().zip(oam.chunks_exact(4)) {
            *sprite = Sprite::from_oam(entry, tall);
        }
        self.height = height;
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn get(&self, slot: usize) -> &Sprite {
        &self.sprites[slot]
    }

    /// The first ten sprites in table order whose rows cover `ly`.
    pub fn select_for_line(&self, ly: u8) -> LineSprites {
        let mut picked = LineSprites::default();
        for (slot, sprite) in self.sprites.iter().enumerate() {
            if sprite.covers(ly, self.height) {
                picked.slots[picked.len] = slot;
                picked.len += 1;
                if picked.len == SPRITES_PER_LINE {
                    break;
                }
            }
        }
        picked
    }
}
