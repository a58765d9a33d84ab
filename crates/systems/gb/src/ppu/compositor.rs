//! Scanline compositing: background, window, then sprites.
//!
//! Each pass works on a full 256-pixel row. Alongside the colors the row
//! keeps the raw background index and the CGB map priority bit per pixel,
//! which the sprite pass consults.

use emu_core::ppu::{flip_row, TileRow, TILE_SIZE};

use super::palette::{ColorPaletteRam, DmgPalettes};
use super::registers::*;
use super::screen::LINE_WIDTH;
use super::sprites::SpriteTable;
use super::tiles::{TileCache, TileSet};
use super::Vram;

const MAP_COLUMNS: usize = 32;

const ATTR_PALETTE: u8 = 0x07;
const ATTR_BANK: u8 = 0x08;
const ATTR_X_FLIP: u8 = 0x20;
const ATTR_Y_FLIP: u8 = 0x40;
const ATTR_PRIORITY: u8 = 0x80;

/// Working row for the scanline being built.
#[derive(Debug, Clone)]
pub struct LineBuffers {
    pub color: [u32; LINE_WIDTH],
    pub raw: [u8; LINE_WIDTH],
    pub bg_priority: [bool; LINE_WIDTH],
}

impl Default for LineBuffers {
    fn default() -> Self {
        Self {
            color: [0; LINE_WIDTH],
            raw: [0; LINE_WIDTH],
            bg_priority: [false; LINE_WIDTH],
        }
    }
}

/// Read-only view of everything a scanline is built from.
pub(super) struct LineContext<'a> {
    pub regs: &'a Registers,
    pub vram: &'a Vram,
    pub tiles: &'a TileCache,
    pub dmg: &'a DmgPalettes,
    pub bg_colors: &'a ColorPaletteRam,
    pub obj_colors: &'a ColorPaletteRam,
    pub sprites: &'a SpriteTable,
    pub cgb: bool,
}

impl LineContext<'_> {
    fn tile_set(&self) -> TileSet {
        if self.regs.lcdc_bit(LCDC_BG_WIN_TILES) {
            TileSet::Unsigned
        } else {
            TileSet::Signed
        }
    }

    /// Decode one 256-pixel map row into `line` without scrolling.
    fn fetch_map_row(&self, map_base: usize, y: u8, line: &mut LineBuffers) {
        let set = self.tile_set();
        let map_row = (y as usize / TILE_SIZE) * MAP_COLUMNS;
        let tile_line = y as usize % TILE_SIZE;

        for col in 0..MAP_COLUMNS {
            let map_offset = map_base + map_row + col;
            let index = self.vram[0][map_offset];
            let attrs = if self.cgb { self.vram[1][map_offset] } else { 0 };

            let row = if attrs & ATTR_Y_FLIP != 0 {
                TILE_SIZE - 1 - tile_line
            } else {
                tile_line
            };
            let bank = usize::from(attrs & ATTR_BANK != 0);
            let mut pixels: TileRow = self.tiles.map_row(set, bank, index, row);
            if attrs & ATTR_X_FLIP != 0 {
                pixels = flip_row(pixels);
            }

            let palette = attrs & ATTR_PALETTE;
            let priority = attrs & ATTR_PRIORITY != 0;
            for (i, &raw) in pixels.iter().enumerate() {
                let x = col * TILE_SIZE + i;
                line.raw[x] = raw;
                line.bg_priority[x] = priority;
                line.color[x] = if self.cgb {
                    self.bg_colors.color(palette, raw)
                } else {
                    self.dmg.bg_color(raw)
                };
            }
        }
    }
}

/// Background layer, rotated left by SCX.
pub(super) fn draw_background(ctx: &LineContext, ly: u8, line: &mut LineBuffers) {
    if !ctx.cgb && !ctx.regs.lcdc_bit(LCDC_BG_WIN_ENABLE) {
        line.color.fill(ctx.dmg.bg_color(0));
        line.raw.fill(0);
        line.bg_priority.fill(false);
        return;
    }

    let mut unscrolled = LineBuffers::default();
    ctx.fetch_map_row(ctx.regs.bg_tilemap(), ly.wrapping_add(ctx.regs.scy), &mut unscrolled);

    let scx = ctx.regs.scx as usize;
    line.color.copy_from_slice(&unscrolled.color);
    line.raw.copy_from_slice(&unscrolled.raw);
    line.bg_priority.copy_from_slice(&unscrolled.bg_priority);
    line.color.rotate_left(scx);
    line.raw.rotate_left(scx);
    line.bg_priority.rotate_left(scx);
}

/// Window layer, overlaid from WX-7 onwards once LY has reached WY.
pub(super) fn draw_window(ctx: &LineContext, ly: u8, line: &mut LineBuffers) {
    let regs = ctx.regs;
    if !regs.lcdc_bit(LCDC_WIN_ENABLE) || ly < regs.wy {
        return;
    }
    if !ctx.cgb && !regs.lcdc_bit(LCDC_BG_WIN_ENABLE) {
        return;
    }

    let mut window = LineBuffers::default();
    ctx.fetch_map_row(regs.window_tilemap(), ly - regs.wy, &mut window);

    // WX below 7 pushes the window's left edge off screen
    let origin = regs.wx as i32 - 7;
    let first = origin.max(0) as usize;
    let skipped = (-origin).max(0) as usize;
    for (x, src) in (first..LINE_WIDTH).zip(skipped..LINE_WIDTH) {
        line.color[x] = window.color[src];
        line.raw[x] = window.raw[src];
        line.bg_priority[x] = window.bg_priority[src];
    }
}

/// Sprite layer. The first ten sprites in table order are drawn in reverse
/// so the lowest slot ends up on top.
pub(super) fn draw_sprites(ctx: &LineContext, ly: u8, line: &mut LineBuffers) {
    if !ctx.regs.lcdc_bit(LCDC_OBJ_ENABLE) {
        return;
    }

    let height = ctx.sprites.height();
    let picked = ctx.sprites.select_for_line(ly);

    for &slot in picked.as_slice().iter().rev() {
        let sprite = ctx.sprites.get(slot);
        let mut row = (ly as i16 - sprite.y) as u8;
        if sprite.y_flip() {
            row = height - 1 - row;
        }
        let tile = if row >= 8 { sprite.tile | 1 } else { sprite.tile };
        let bank = if ctx.cgb { sprite.vram_bank() } else { 0 };

        let mut pixels = ctx.tiles.sprite_row(bank, tile, (row % 8) as usize);
        if sprite.x_flip() {
            pixels = flip_row(pixels);
        }

        for (i, &raw) in pixels.iter().enumerate() {
            let x = sprite.x + i as i16;
            if raw == 0 || !(0..LINE_WIDTH as i16).contains(&x) {
                continue;
            }
            let x = x as usize;
            if !sprite_visible(ctx, sprite.behind_bg(), line, x) {
                continue;
            }
            line.color[x] = if ctx.cgb {
                ctx.obj_colors.color(sprite.cgb_palette(), raw)
            } else {
                ctx.dmg.obj_color(sprite.dmg_palette(), raw)
            };
        }
    }
}

fn sprite_visible(ctx: &LineContext, behind_bg: bool, line: &LineBuffers, x: usize) -> bool {
    if line.raw[x] == 0 {
        return true;
    }
    if ctx.cgb {
        // LCDC.0 clear: sprites win everywhere
        if !ctx.regs.lcdc_bit(LCDC_BG_WIN_ENABLE) {
            return true;
        }
        !line.bg_priority[x] && !behind_bg
    } else {
        !behind_bg
    }
}
