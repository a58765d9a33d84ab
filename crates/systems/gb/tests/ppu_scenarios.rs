//! Whole-PPU scenarios driven through the bus the way an interpreter would.

use emu_core::graphics::ColorOps;
use emu_gb::ppu::palette::DEFAULT_SHADES;
use emu_gb::ppu::registers::*;
use emu_gb::ppu::{Mode, CYCLES_PER_FRAME, CYCLES_PER_LINE, SCREEN_WIDTH, VISIBLE_LINES};
use emu_gb::{GbBus, HardwareModel, PpuConfig};

const WHITE: u32 = DEFAULT_SHADES[0];
const LIGHT: u32 = DEFAULT_SHADES[1];
const DARK: u32 = DEFAULT_SHADES[2];
const BLACK: u32 = DEFAULT_SHADES[3];

fn dmg_bus() -> GbBus {
    GbBus::new(PpuConfig::default())
}

fn cgb_bus() -> GbBus {
    GbBus::new(PpuConfig {
        model: HardwareModel::Cgb,
        ..PpuConfig::default()
    })
}

/// Write sixteen tile bytes starting at `addr`.
fn write_tile(bus: &mut GbBus, addr: u16, bytes: &[u8; 16]) {
    for (i, &b) in bytes.iter().enumerate() {
        bus.write(addr + i as u16, b);
    }
}

/// Every row decodes to the same index.
fn solid_tile(index: u8) -> [u8; 16] {
    let lo = if index & 1 != 0 { 0xFF } else { 0x00 };
    let hi = if index & 2 != 0 { 0xFF } else { 0x00 };
    let mut bytes = [0; 16];
    for row in bytes.chunks_exact_mut(2) {
        row[0] = lo;
        row[1] = hi;
    }
    bytes
}

fn fill_map(bus: &mut GbBus, base: u16, tile: u8) {
    for i in 0..0x400 {
        bus.write(base + i, tile);
    }
}

fn set_sprite(bus: &mut GbBus, slot: u16, y: u8, x: u8, tile: u8, flags: u8) {
    let addr = OAM_START + slot * 4;
    bus.write(addr, y);
    bus.write(addr + 1, x);
    bus.write(addr + 2, tile);
    bus.write(addr + 3, flags);
}

fn run_frame(bus: &mut GbBus) {
    bus.step(CYCLES_PER_FRAME);
}

fn px(bus: &GbBus, x: usize, y: usize) -> u32 {
    bus.ppu.screen().pixel(x, y)
}

#[test]
fn mode_sequence_over_a_whole_frame() {
    let mut bus = dmg_bus();
    for line in 0..154u32 {
        let mut runs: Vec<(Mode, u32)> = Vec::new();
        for _ in 0..CYCLES_PER_LINE {
            assert_eq!(bus.ppu.ly() as u32, line);
            let mode = bus.ppu.mode();
            match runs.last_mut() {
                Some((m, n)) if *m == mode => *n += 1,
                _ => runs.push((mode, 1)),
            }
            bus.step(1);
        }
        if line < VISIBLE_LINES as u32 {
            assert_eq!(
                runs,
                vec![(Mode::OamSearch, 80), (Mode::PixelTransfer, 172), (Mode::HBlank, 204)],
                "line {}",
                line
            );
        } else {
            assert_eq!(runs, vec![(Mode::VBlank, 456)], "line {}", line);
        }
    }
    assert_eq!(bus.ppu.ly(), 0);
}

#[test]
fn lyc_interrupt_once_per_reached_line() {
    let mut bus = dmg_bus();
    bus.write(REG_LYC, 100);
    bus.write(REG_STAT, STAT_LYC_INT);

    let mut raised = 0;
    for _ in 0..3 {
        for _ in 0..154 {
            bus.step(CYCLES_PER_LINE);
            if bus.memory.interrupt_flags() & 0x02 != 0 {
                raised += 1;
                bus.memory.acknowledge(emu_gb::Interrupt::LcdStat);
            }
        }
    }
    assert_eq!(raised, 3);

    // Disabling the enable bit keeps the flag but stops the interrupt
    bus.write(REG_STAT, 0);
    bus.step(CYCLES_PER_FRAME);
    assert_eq!(bus.memory.interrupt_flags() & 0x02, 0);
}

#[test]
fn tile_rows_decode_independently() {
    let mut bus = dmg_bus();
    let mut bytes = [0u8; 16];
    bytes[0] = 0xFF;
    bytes[1] = 0xFF;
    write_tile(&mut bus, 0x8010, &bytes);
    fill_map(&mut bus, 0x9800, 1);
    bus.write(REG_BGP, 0xE4);
    run_frame(&mut bus);
    assert!(bus.ppu.screen().row(0)[..160].iter().all(|&p| p == BLACK));
    assert!(bus.ppu.screen().row(1)[..160].iter().all(|&p| p == WHITE));

    // Rewrite row 3 only
    bus.write(0x8016, 0xFF);
    bus.write(0x8017, 0x00);
    run_frame(&mut bus);
    for y in 0..8 {
        let expected = match y {
            0 => BLACK,
            3 => LIGHT,
            _ => WHITE,
        };
        assert_eq!(px(&bus, 10, y), expected, "row {}", y);
    }
}

#[test]
fn checkerboard_background_end_to_end() {
    let mut bus = dmg_bus();
    let mut checker = [0u8; 16];
    for (row, pair) in checker.chunks_exact_mut(2).enumerate() {
        let pattern = if row % 2 == 0 { 0xAA } else { 0x55 };
        pair[0] = pattern;
        pair[1] = pattern;
    }
    write_tile(&mut bus, 0x8000, &[0; 16]);
    write_tile(&mut bus, 0x8010, &checker);
    for col in 0..32 {
        bus.write(0x9800 + col, 1);
    }
    bus.write(REG_BGP, 0xE4);
    bus.write(REG_SCX, 0);
    run_frame(&mut bus);

    let expected: Vec<u32> = (0..160)
        .map(|x| if x % 2 == 0 { BLACK } else { WHITE })
        .collect();
    assert_eq!(&bus.ppu.screen().row(0)[..160], expected.as_slice());
    // Row 1 of the tile is the inverse
    assert_eq!(px(&bus, 0, 1), WHITE);
    assert_eq!(px(&bus, 1, 1), BLACK);
    // Map row 1 still points at blank tile 0
    assert_eq!(px(&bus, 0, 8), WHITE);

    let frame = bus.frame();
    assert_eq!(frame.pixel(0, 0), Some(BLACK));
}

#[test]
fn tall_sprite_at_origin_draws_over_background() {
    let mut bus = dmg_bus();
    // Background is index 1 everywhere
    write_tile(&mut bus, 0x8000, &solid_tile(1));
    bus.write(REG_BGP, 0xE4);

    let mut top = [0u8; 16];
    top[1] = 0xFF; // row 0: index 2
    write_tile(&mut bus, 0x8020, &top);
    let mut bottom = [0u8; 16];
    bottom[0] = 0xFF; // row 0 of the lower half: index 1
    write_tile(&mut bus, 0x8030, &bottom);

    set_sprite(&mut bus, 0, 16, 8, 0x03, 0x00);
    // index 1 -> shade 2, index 2 -> shade 3
    bus.write(REG_OBP0, 0x38);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_SIZE | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 0, 0), BLACK);
    assert_eq!(px(&bus, 7, 0), BLACK);
    assert_eq!(px(&bus, 8, 0), LIGHT, "background beside the sprite");
    assert_eq!(px(&bus, 0, 1), LIGHT, "transparent row shows background");
    assert_eq!(px(&bus, 0, 8), DARK, "lower half comes from the odd tile");
    assert_eq!(px(&bus, 0, 16), LIGHT);
}

#[test]
fn transparent_sprite_never_shows() {
    let mut bus = dmg_bus();
    bus.write(REG_BGP, 0xE4);
    // Tile 2 stays all zero
    for (slot, flags) in [0x00u8, 0x80, 0x60].iter().enumerate() {
        set_sprite(&mut bus, slot as u16, 16, 8 + slot as u8 * 8, 2, *flags);
    }
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);
    assert!(bus.ppu.screen().row(0)[..24].iter().all(|&p| p == WHITE));
}

#[test]
fn x_flip_mirrors_the_sprite_row() {
    let mut bus = dmg_bus();
    bus.write(REG_BGP, 0xE4);
    // Every row: index 3, index 1, then transparent
    let mut tile = [0u8; 16];
    for row in tile.chunks_exact_mut(2) {
        row[0] = 0xC0;
        row[1] = 0x80;
    }
    write_tile(&mut bus, 0x8020, &tile);
    set_sprite(&mut bus, 0, 16, 8, 2, 0x00);
    set_sprite(&mut bus, 1, 16, 24, 2, 0x20);
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 0, 0), BLACK);
    assert_eq!(px(&bus, 1, 0), LIGHT);
    assert_eq!(px(&bus, 2, 0), WHITE);
    assert_eq!(px(&bus, 23, 0), BLACK);
    assert_eq!(px(&bus, 22, 0), LIGHT);
    assert_eq!(px(&bus, 16, 0), WHITE);
}

#[test]
fn y_flip_swaps_tall_sprite_halves() {
    let mut bus = dmg_bus();
    bus.write(REG_BGP, 0xE4);
    // Top tile: row 0 is index 1. Bottom tile: row 7 is index 2.
    let mut top = [0u8; 16];
    top[0] = 0xFF;
    write_tile(&mut bus, 0x8040, &top);
    let mut bottom = [0u8; 16];
    bottom[15] = 0xFF;
    write_tile(&mut bus, 0x8050, &bottom);

    set_sprite(&mut bus, 0, 16, 8, 0x04, 0x00);
    // Odd tile number is forced even in 8x16 mode
    set_sprite(&mut bus, 1, 16, 16, 0x05, 0x40);
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_SIZE | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 0, 0), LIGHT);
    assert_eq!(px(&bus, 0, 15), DARK);

    assert_eq!(px(&bus, 8, 0), DARK, "flipped top row is the bottom tile's last row");
    assert_eq!(px(&bus, 8, 1), WHITE);
    assert_eq!(px(&bus, 8, 15), LIGHT, "flipped bottom row is the top tile's first row");
}

#[test]
fn behind_background_sprite_only_shows_over_index_zero() {
    let mut bus = dmg_bus();
    // Background row 0 alternates index 3 and 0
    let mut stripes = [0u8; 16];
    stripes[0] = 0xAA;
    stripes[1] = 0xAA;
    write_tile(&mut bus, 0x8010, &stripes);
    fill_map(&mut bus, 0x9800, 1);
    bus.write(REG_BGP, 0xE4);

    write_tile(&mut bus, 0x8020, &solid_tile(2));
    set_sprite(&mut bus, 0, 16, 8, 2, 0x80);
    set_sprite(&mut bus, 1, 16, 16, 2, 0x00);
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    for x in 0..8 {
        let expected = if x % 2 == 0 { BLACK } else { DARK };
        assert_eq!(px(&bus, x, 0), expected, "x={}", x);
    }
    for x in 8..16 {
        assert_eq!(px(&bus, x, 0), DARK, "x={}", x);
    }
}

#[test]
fn lower_table_slot_wins_overlaps() {
    let mut bus = dmg_bus();
    write_tile(&mut bus, 0x8020, &solid_tile(2));
    set_sprite(&mut bus, 0, 16, 8, 2, 0x00);
    set_sprite(&mut bus, 1, 16, 12, 2, 0x10);
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_OBP1, 0xFF);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 5, 0), DARK);
    assert_eq!(px(&bus, 9, 0), BLACK);
}

#[test]
fn only_ten_sprites_per_line_in_table_order() {
    let mut bus = dmg_bus();
    write_tile(&mut bus, 0x8020, &solid_tile(3));
    for i in 0..11u8 {
        set_sprite(&mut bus, i as u16, 16, 8 + i * 8, 2, 0x00);
    }
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 72, 0), BLACK);
    assert_eq!(px(&bus, 80, 0), WHITE, "eleventh sprite is dropped");
}

#[test]
fn window_overlays_from_wx_minus_seven() {
    let mut bus = dmg_bus();
    write_tile(&mut bus, 0x8010, &solid_tile(3));
    fill_map(&mut bus, 0x9C00, 1);
    bus.write(REG_BGP, 0xE4);
    bus.write(REG_WY, 10);
    bus.write(REG_WX, 47);
    bus.write(REG_LCDC, 0x91 | LCDC_WIN_ENABLE | LCDC_WIN_TILEMAP);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 40, 9), WHITE);
    assert_eq!(px(&bus, 39, 10), WHITE);
    assert_eq!(px(&bus, 40, 10), BLACK);
    assert_eq!(px(&bus, 159, 143), BLACK);
}

#[test]
fn window_left_of_the_screen_edge() {
    // Window tile column 0 is index 3, the rest index 0
    let mut tile = [0u8; 16];
    for row in tile.chunks_exact_mut(2) {
        row[0] = 0x80;
        row[1] = 0x80;
    }

    for (wx, first_dark) in [(0u8, 1usize), (3, 4), (6, 7), (7, 0)] {
        let mut bus = dmg_bus();
        write_tile(&mut bus, 0x8010, &tile);
        fill_map(&mut bus, 0x9C00, 1);
        bus.write(REG_BGP, 0xE4);
        bus.write(REG_WY, 0);
        bus.write(REG_WX, wx);
        bus.write(REG_LCDC, 0x91 | LCDC_WIN_ENABLE | LCDC_WIN_TILEMAP);
        run_frame(&mut bus);

        for x in 0..SCREEN_WIDTH {
            let expected = if x % 8 == first_dark { BLACK } else { WHITE };
            assert_eq!(px(&bus, x, 0), expected, "WX={} x={}", wx, x);
        }
        assert_eq!(px(&bus, first_dark, 143), BLACK, "WX={}", wx);
    }
}

#[test]
fn horizontal_scroll_wraps_the_map_row() {
    let mut bus = GbBus::new(PpuConfig {
        present_full_width: true,
        ..PpuConfig::default()
    });
    write_tile(&mut bus, 0x8010, &solid_tile(3));
    bus.write(0x9800, 1);
    bus.write(REG_BGP, 0xE4);
    bus.write(REG_SCX, 4);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 3, 0), BLACK);
    assert_eq!(px(&bus, 4, 0), WHITE);
    assert_eq!(px(&bus, 251, 0), WHITE);
    assert_eq!(px(&bus, 252, 0), BLACK);
    assert_eq!(bus.frame().pixel(252, 0), Some(BLACK));
}

#[test]
fn signed_tile_addressing() {
    let mut bus = dmg_bus();
    write_tile(&mut bus, 0x9000, &solid_tile(3));
    write_tile(&mut bus, 0x8800, &solid_tile(2));
    bus.write(0x9801, 0x80);
    bus.write(REG_BGP, 0xE4);
    bus.write(REG_LCDC, 0x81);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 0, 0), BLACK);
    assert_eq!(px(&bus, 8, 0), DARK);
}

#[test]
fn dmg_background_disable_blanks_to_shade_zero() {
    let mut bus = dmg_bus();
    write_tile(&mut bus, 0x8000, &solid_tile(3));
    write_tile(&mut bus, 0x8010, &solid_tile(1));
    set_sprite(&mut bus, 0, 16, 8, 1, 0x80);
    bus.write(REG_BGP, 0xE4);
    bus.write(REG_OBP0, 0xE4);
    bus.write(REG_LCDC, 0x90 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    assert_eq!(px(&bus, 0, 0), LIGHT, "sprite drawn over blanked background");
    assert_eq!(px(&bus, 8, 0), WHITE);
}

#[test]
fn cgb_palette_round_trip_through_bus() {
    let mut bus = cgb_bus();
    let colors: [u16; 4] = [0x7FFF, 0x1234, 0x5AD6, 0x0001];

    bus.write(REG_BCPS, 0x80 | 0x10);
    for color in colors {
        bus.write(REG_BCPD, color as u8);
        bus.write(REG_BCPD, (color >> 8) as u8);
    }
    assert_eq!(bus.read(REG_BCPS) & 0x3F, 0x18);

    bus.write(REG_BCPS, 0x80 | 0x10);
    for color in colors {
        let lo = bus.read(REG_BCPD);
        bus.write(REG_BCPS, bus.read(REG_BCPS) + 1);
        let hi = bus.read(REG_BCPD);
        bus.write(REG_BCPS, bus.read(REG_BCPS) + 1);
        assert_eq!(u16::from_le_bytes([lo, hi]), color);
    }
}

#[test]
fn cgb_attributes_select_bank_palette_and_flip() {
    let mut bus = cgb_bus();
    // Palette 1: color 1 red, color 3 blue
    bus.write(REG_BCPS, 0x80 | 0x0A);
    for b in [0x1F, 0x00, 0x00, 0x00, 0x00, 0x7C] {
        bus.write(REG_BCPD, b);
    }

    // Bank 1 tile 1: solid index 3
    bus.write(REG_VBK, 1);
    write_tile(&mut bus, 0x8010, &solid_tile(3));
    bus.write(0x9800, 0x09); // bank 1, palette 1
    bus.write(0x9801, 0x21); // palette 1, x-flip
    bus.write(REG_VBK, 0);

    // Bank 0 tile 1: only the leftmost pixel set
    let mut edge = [0u8; 16];
    for row in edge.chunks_exact_mut(2) {
        row[0] = 0x80;
    }
    write_tile(&mut bus, 0x8010, &edge);
    bus.write(0x9800, 1);
    bus.write(0x9801, 1);
    run_frame(&mut bus);

    let red = ColorOps::from_rgb555(0x001F);
    let blue = ColorOps::from_rgb555(0x7C00);
    let white = ColorOps::from_rgb555(0x7FFF);
    assert_eq!(px(&bus, 0, 0), blue);
    assert_eq!(px(&bus, 7, 0), blue);
    assert_eq!(px(&bus, 8, 0), white, "flipped edge pixel leaves column 8 blank");
    assert_eq!(px(&bus, 15, 0), red);
    assert_eq!(px(&bus, 16, 0), white);
}

#[test]
fn cgb_map_priority_and_master_override() {
    let mut bus = cgb_bus();
    write_tile(&mut bus, 0x8000, &solid_tile(1));
    write_tile(&mut bus, 0x8020, &solid_tile(1));
    bus.write(REG_VBK, 1);
    bus.write(0x9800, 0x80); // BG-over-sprite
    bus.write(REG_VBK, 0);

    // Object palette 0, color 1: green
    bus.write(REG_OCPS, 0x82);
    bus.write(REG_OCPD, 0xE0);
    bus.write(REG_OCPD, 0x03);
    set_sprite(&mut bus, 0, 16, 8, 2, 0x00);
    set_sprite(&mut bus, 1, 16, 16, 2, 0x00);
    bus.write(REG_LCDC, 0x91 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);

    let green = ColorOps::from_rgb555(0x03E0);
    assert_ne!(px(&bus, 0, 0), green, "map priority keeps the background on top");
    assert_eq!(px(&bus, 8, 0), green);

    bus.write(REG_LCDC, 0x90 | LCDC_OBJ_ENABLE);
    run_frame(&mut bus);
    assert_eq!(px(&bus, 0, 0), green, "LCDC.0 clear lets sprites win everywhere");
}

#[test]
fn hblank_dma_feeds_tiles_between_lines() {
    let mut bus = cgb_bus();
    for i in 0..16 {
        bus.write(0xC000 + i, 0xFF);
    }
    bus.write(REG_HDMA1, 0xC0);
    bus.write(REG_HDMA2, 0x00);
    bus.write(REG_HDMA3, 0x00);
    bus.write(REG_HDMA4, 0x10);
    bus.write(REG_HDMA5, 0x80);
    fill_map(&mut bus, 0x9800, 1);

    // Line 0 is composited before its HBlank copy lands
    run_frame(&mut bus);
    let white = ColorOps::from_rgb555(0x7FFF);
    assert_eq!(px(&bus, 0, 0), white);
    assert_eq!(bus.read(REG_HDMA5), 0xFF);
    assert_eq!(bus.read(0x801F), 0xFF);
}
