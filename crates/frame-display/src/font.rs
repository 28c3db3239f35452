//! Glyph metrics and glyph rasterization.
//!
//! Advance widths come from the device font's metric table, defined at a
//! reference size of 50 px with a 60 px line pitch and 4 px of spacing after
//! every glyph. Other sizes scale linearly with round-half-up and a 1 px
//! floor, so metrics stay deterministic and never shrink as size grows.
//!
//! Glyph shapes are the public-domain 8×8 `font8x8` set stretched into each
//! glyph's cell. They are only there so text is legible on screen; layout
//! depends on the metric table alone.

use font8x8::{BASIC_FONTS, UnicodeFonts};

use crate::color::Rgb;
use crate::framebuffer::FrameBuffer;

/// Size at which the metric table is defined.
pub const REFERENCE_SIZE: u32 = 50;

const REFERENCE_LINE_HEIGHT: u32 = 60;
const CHAR_SPACING: u32 = 4;

/// Ink width of characters outside the table.
const UNKNOWN_GLYPH_WIDTH: u32 = 25;

/// Ink widths for U+0020..=U+007E at [`REFERENCE_SIZE`].
const GLYPH_WIDTHS: [u8; 95] = [
    13, 5, 13, 19, 17, 34, 20, 5, 10, 11, 21, 19, 8, 17, 6, 15, // ' '..'/'
    18, 16, 16, 15, 18, 15, 17, 15, 18, 17, 6, 8, 19, 19, 19, 14, // '0'..'?'
    31, 22, 18, 16, 19, 17, 17, 18, 19, 12, 14, 19, 16, 23, 19, 20, // '@'..'O'
    18, 22, 20, 17, 20, 19, 21, 23, 21, 23, 17, 9, 15, 10, 20, 25, // 'P'..'_'
    11, 19, 18, 13, 18, 16, 15, 20, 18, 5, 11, 18, 8, 28, 18, 18, // '`'..'o'
    18, 18, 11, 15, 14, 17, 19, 30, 20, 20, 16, 12, 5, 12, 17, // 'p'..'~'
];

fn reference_width(ch: char) -> u32 {
    match ch {
        ' '..='~' => u32::from(GLYPH_WIDTHS[ch as usize - 0x20]),
        _ => UNKNOWN_GLYPH_WIDTH,
    }
}

fn scaled(value: u32, size: u32) -> u32 {
    let reference = u64::from(REFERENCE_SIZE);
    let v = (u64::from(value) * u64::from(size) + reference / 2) / reference;
    u32::try_from(v).unwrap_or(u32::MAX).max(1)
}

/// Ink width of `ch` at `size`, excluding spacing.
#[must_use]
pub fn glyph_width(ch: char, size: u32) -> u32 {
    scaled(reference_width(ch), size)
}

/// Horizontal distance from the start of `ch` to the start of the next glyph.
#[must_use]
pub fn advance(ch: char, size: u32) -> u32 {
    scaled(reference_width(ch) + CHAR_SPACING, size)
}

/// Vertical distance between consecutive baselines.
#[must_use]
pub fn line_height(size: u32) -> u32 {
    scaled(REFERENCE_LINE_HEIGHT, size)
}

fn glyph_height(size: u32) -> u32 {
    scaled(REFERENCE_SIZE, size)
}

/// Draw `ch` with its cell's top-left corner at `(x, y)`.
///
/// The glyph is centred vertically within one line pitch.
pub(crate) fn draw_glyph(fb: &mut FrameBuffer, x: i64, y: i64, ch: char, size: u32, rgb: Rgb) {
    if ch.is_whitespace() {
        return;
    }
    let Some(bits) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
        return;
    };

    let w = i64::from(glyph_width(ch, size));
    let h = i64::from(glyph_height(size));
    let top = y + (i64::from(line_height(size)) - h) / 2;

    // Only the part of the cell that lands on the grid is walked.
    let rows = (-top).max(0)..h.min(i64::from(fb.height()) - top);
    let cols = (-x).max(0)..w.min(i64::from(fb.width()) - x);

    for dy in rows {
        let row = bits[(dy * 8 / h) as usize];
        if row == 0 {
            continue;
        }
        for dx in cols.clone() {
            if (row >> (dx * 8 / w)) & 1 == 0 {
                continue;
            }
            if let (Ok(px), Ok(py)) = (i32::try_from(x + dx), i32::try_from(top + dy)) {
                fb.set(px, py, rgb);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_size_uses_table_plus_spacing() {
        assert_eq!(advance('A', REFERENCE_SIZE), 26);
        assert_eq!(advance(' ', REFERENCE_SIZE), 17);
        assert_eq!(advance('%', REFERENCE_SIZE), 38);
        assert_eq!(advance('é', REFERENCE_SIZE), 29);
        assert_eq!(line_height(REFERENCE_SIZE), 60);
    }

    #[test]
    fn metrics_scale_and_never_vanish() {
        assert_eq!(advance('A', 25), 13);
        assert_eq!(line_height(25), 30);
        assert_eq!(advance('i', 1), 1);
        assert_eq!(line_height(0), 1);
    }

    #[test]
    fn metrics_are_monotonic_in_size() {
        for ch in [' ', 'i', 'W', '%', '\u{263A}'] {
            let mut prev = 0;
            for size in 1..300 {
                let a = advance(ch, size);
                assert!(a >= prev, "advance({ch:?}) shrank at size {size}");
                prev = a;
            }
        }
    }

    #[test]
    fn glyph_ink_stays_inside_its_cell() {
        let mut fb = FrameBuffer::new(64, 64);
        draw_glyph(&mut fb, 10, 0, 'M', 20, Rgb::new(255, 255, 255));
        let w = glyph_width('M', 20) as i32;
        let lh = line_height(20) as i32;
        let mut any = false;
        for y in 0..64 {
            for x in 0..64 {
                if fb.pixel(x, y) == Some(Rgb::new(255, 255, 255)) {
                    any = true;
                    assert!((10..10 + w).contains(&x) && (0..lh).contains(&y));
                }
            }
        }
        assert!(any);
    }

    /// Unclipped cell walk, for comparison with the clipped one.
    fn draw_glyph_unclipped(fb: &mut FrameBuffer, x: i64, y: i64, ch: char, size: u32, rgb: Rgb) {
        let bits = BASIC_FONTS.get(ch).unwrap();
        let w = i64::from(glyph_width(ch, size));
        let h = i64::from(glyph_height(size));
        let top = y + (i64::from(line_height(size)) - h) / 2;
        for dy in 0..h {
            for dx in 0..w {
                if (bits[(dy * 8 / h) as usize] >> (dx * 8 / w)) & 1 == 1 {
                    fb.set((x + dx) as i32, (top + dy) as i32, rgb);
                }
            }
        }
    }

    #[test]
    fn clipped_glyph_matches_full_walk() {
        let ink = Rgb::new(255, 255, 255);
        for (x, y) in [(-30, -40), (20, 10), (-5, 25), (0, 0)] {
            let mut clipped = FrameBuffer::new(32, 32);
            let mut full = FrameBuffer::new(32, 32);
            draw_glyph(&mut clipped, x, y, 'R', 120, ink);
            draw_glyph_unclipped(&mut full, x, y, 'R', 120, ink);
            assert_eq!(clipped.pixels(), full.pixels(), "glyph at ({x}, {y})");
        }
    }

    #[test]
    fn huge_glyph_only_touches_visible_cells() {
        let ink = Rgb::new(255, 255, 255);
        let size = 20_000;
        let h = i64::from(glyph_height(size));
        // Put the glyph's first row at the top of the grid.
        let y = -(i64::from(line_height(size)) - h) / 2;
        let mut fb = FrameBuffer::new(64, 64);
        draw_glyph(&mut fb, 0, y, 'W', size, ink);

        let bits = BASIC_FONTS.get('W').unwrap();
        let expect_ink = bits[0] & 1 == 1;
        assert_eq!(fb.pixel(0, 0) == Some(ink), expect_ink);
        assert_eq!(fb.pixel(63, 63) == Some(ink), expect_ink);
    }

    #[test]
    fn glyph_far_off_grid_draws_nothing() {
        let mut fb = FrameBuffer::new(16, 16);
        draw_glyph(&mut fb, -1_000_000_000, 0, 'W', 1_000_000, Rgb::new(255, 255, 255));
        draw_glyph(&mut fb, 0, 2_000_000_000, 'W', 1_000_000, Rgb::new(255, 255, 255));
        assert!(!fb.is_dirty());
    }

    #[test]
    fn whitespace_draws_nothing() {
        let mut fb = FrameBuffer::new(32, 32);
        draw_glyph(&mut fb, 0, 0, ' ', 20, Rgb::new(255, 255, 255));
        assert!(!fb.is_dirty());
    }
}
