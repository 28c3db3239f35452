//! Primitive rasterization.
//!
//! These functions take an already-resolved [`Rgb`]; color validation and
//! palette lookups happen in [`crate::Display`] before anything here runs, so
//! a rejected color never leaves a half-drawn shape behind.

use crate::color::Rgb;
use crate::framebuffer::FrameBuffer;

/// Integer Bresenham line, both endpoints inclusive.
///
/// The dominant axis advances every step; the minor axis advances whenever
/// the error term, seeded with `2*minor - major`, crosses zero. The minor
/// offset at step `i` is computed directly, so only the steps whose major
/// coordinate lands on the grid are visited.
pub fn line(fb: &mut FrameBuffer, x1: i32, y1: i32, x2: i32, y2: i32, rgb: Rgb) {
    if entirely_off_grid(fb, x1, y1, x2, y2) {
        return;
    }

    let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let sx = if x2 >= x1 { 1 } else { -1 };
    let sy = if y2 >= y1 { 1 } else { -1 };

    let x_major = dx >= dy;
    let (major, minor) = if x_major { (dx, dy) } else { (dy, dx) };
    let (m0, n0, sm, sn, extent) = if x_major {
        (x1, y1, sx, sy, i64::from(fb.width()))
    } else {
        (y1, x1, sy, sx, i64::from(fb.height()))
    };

    // Steps whose major coordinate is in [0, extent).
    let (first, last) = if sm > 0 {
        (-m0, extent - 1 - m0)
    } else {
        (m0 - (extent - 1), m0)
    };

    for i in first.max(0)..=last.min(major) {
        let m = m0 + sm * i;
        let n = n0 + sn * minor_steps(i, major, minor);
        if x_major {
            plot(fb, m, n, rgb);
        } else {
            plot(fb, n, m, rgb);
        }
    }
}

/// Minor-axis steps taken before step `i`: `ceil((2*minor*i - major) / (2*major))`.
fn minor_steps(i: i64, major: i64, minor: i64) -> i64 {
    if major == 0 {
        return 0;
    }
    let num = 2 * i128::from(minor) * i128::from(i) - i128::from(major);
    let den = 2 * i128::from(major);
    (-((-num).div_euclid(den))).max(0) as i64
}

/// One-pixel outline of the `w × h` rectangle at `(x, y)`. No fill.
pub fn rect_outline(fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, rgb: Rgb) {
    if w <= 0 || h <= 0 {
        return;
    }
    let right = x.saturating_add(w - 1);
    let bottom = y.saturating_add(h - 1);
    fb.fill_rect(x, y, w, 1, rgb);
    fb.fill_rect(x, bottom, w, 1, rgb);
    fb.fill_rect(x, y, 1, h, rgb);
    fb.fill_rect(right, y, 1, h, rgb);
}

/// Solid rectangle.
pub fn fill_rect(fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, rgb: Rgb) {
    fb.fill_rect(x, y, w, h, rgb);
}

/// Rectangle filled with `fill`, then framed by a `border`-thick edge.
///
/// Each band is clamped to the side it runs across, so a border at least
/// half the shorter side leaves no fill, while odd sizes keep their
/// centre row or column of fill.
pub fn rect_filled(
    fb: &mut FrameBuffer,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    border: i32,
    border_rgb: Rgb,
    fill_rgb: Rgb,
) {
    if w <= 0 || h <= 0 {
        return;
    }
    fb.fill_rect(x, y, w, h, fill_rgb);
    if border <= 0 {
        return;
    }

    let tv = border.min(h);
    let th = border.min(w);
    fb.fill_rect(x, y, w, tv, border_rgb);
    fb.fill_rect(x, y.saturating_add(h - tv), w, tv, border_rgb);
    fb.fill_rect(x, y, th, h, border_rgb);
    fb.fill_rect(x.saturating_add(w - th), y, th, h, border_rgb);
}

fn plot(fb: &mut FrameBuffer, x: i64, y: i64, rgb: Rgb) {
    if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
        fb.set(x, y, rgb);
    }
}

/// Both endpoints beyond the same edge: nothing can be visible.
fn entirely_off_grid(fb: &FrameBuffer, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
    let w = i64::from(fb.width());
    let h = i64::from(fb.height());
    let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));
    (x1 < 0 && x2 < 0) || (y1 < 0 && y2 < 0) || (x1 >= w && x2 >= w) || (y1 >= h && y2 >= h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const INK: Rgb = Rgb::new(255, 255, 255);
    const FILL: Rgb = Rgb::new(0, 0, 255);

    fn lit(fb: &FrameBuffer, rgb: Rgb) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in 0..fb.height() as i32 {
            for x in 0..fb.width() as i32 {
                if fb.pixel(x, y) == Some(rgb) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn horizontal_line_sets_exactly_its_span() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, 0, 0, 9, 0, INK);
        let expected: Vec<_> = (0..10).map(|x| (x, 0)).collect();
        assert_eq!(lit(&fb, INK), expected);
    }

    #[test]
    fn vertical_line_sets_exactly_its_span() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, 0, 0, 0, 9, INK);
        let expected: Vec<_> = (0..10).map(|y| (0, y)).collect();
        assert_eq!(lit(&fb, INK), expected);
    }

    #[test]
    fn reversed_endpoints_draw_the_same_diagonal() {
        let mut a = FrameBuffer::new(16, 16);
        let mut b = FrameBuffer::new(16, 16);
        line(&mut a, 0, 0, 5, 5, INK);
        line(&mut b, 5, 5, 0, 0, INK);
        assert_eq!(lit(&a, INK), lit(&b, INK));
        assert_eq!(lit(&a, INK).len(), 6);
    }

    #[test]
    fn shallow_line_steps_minor_axis_midway() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, 0, 0, 4, 2, INK);
        assert_eq!(lit(&fb, INK), vec![(0, 0), (1, 0), (2, 1), (3, 1), (4, 2)]);
    }

    #[test]
    fn steep_line_covers_every_row_once() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, 3, 0, 1, 7, INK);
        let pixels = lit(&fb, INK);
        assert_eq!(pixels.len(), 8);
        for y in 0..8 {
            assert_eq!(pixels.iter().filter(|p| p.1 == y).count(), 1);
        }
        assert!(pixels.contains(&(3, 0)) && pixels.contains(&(1, 7)));
    }

    #[test]
    fn line_partially_off_grid_draws_visible_part() {
        let mut fb = FrameBuffer::new(8, 8);
        line(&mut fb, -4, 2, 3, 2, INK);
        assert_eq!(lit(&fb, INK), vec![(0, 2), (1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut fb = FrameBuffer::new(8, 8);
        rect_outline(&mut fb, 1, 1, 3, 3, INK);
        let pixels = lit(&fb, INK);
        assert_eq!(pixels.len(), 8);
        assert!(!pixels.contains(&(2, 2)));
    }

    #[test]
    fn zero_border_matches_plain_fill() {
        let mut a = FrameBuffer::new(12, 12);
        let mut b = FrameBuffer::new(12, 12);
        rect_filled(&mut a, 2, 3, 7, 5, 0, INK, FILL);
        fill_rect(&mut b, 2, 3, 7, 5, FILL);
        assert_eq!(a.pixels(), b.pixels());
    }

    #[test]
    fn thick_border_consumes_whole_rect() {
        let mut fb = FrameBuffer::new(12, 12);
        rect_filled(&mut fb, 0, 0, 6, 4, 2, INK, FILL);
        assert!(lit(&fb, FILL).is_empty());
        assert_eq!(lit(&fb, INK).len(), 24);
    }

    #[test]
    fn odd_square_keeps_centre_fill() {
        let mut fb = FrameBuffer::new(8, 8);
        rect_filled(&mut fb, 0, 0, 3, 3, 1, INK, FILL);
        assert_eq!(lit(&fb, FILL), vec![(1, 1)]);
        assert_eq!(lit(&fb, INK).len(), 8);
    }

    #[test]
    fn odd_rect_keeps_centre_column_of_fill() {
        let mut fb = FrameBuffer::new(8, 8);
        rect_filled(&mut fb, 0, 0, 5, 7, 2, INK, FILL);
        assert_eq!(lit(&fb, FILL), vec![(2, 2), (2, 3), (2, 4)]);
        assert_eq!(lit(&fb, INK).len(), 32);
    }

    #[test]
    fn border_wider_than_rect_is_all_border() {
        let mut fb = FrameBuffer::new(8, 8);
        rect_filled(&mut fb, 1, 1, 3, 2, 10, INK, FILL);
        assert!(lit(&fb, FILL).is_empty());
        assert_eq!(lit(&fb, INK).len(), 6);
    }

    #[test]
    fn huge_off_grid_line_draws_visible_row() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, -2_000_000_000, 5, 2_000_000_000, 5, INK);
        let expected: Vec<_> = (0..16).map(|x| (x, 5)).collect();
        assert_eq!(lit(&fb, INK), expected);
    }

    #[test]
    fn huge_diagonal_crosses_grid_corner_to_corner() {
        let mut fb = FrameBuffer::new(16, 16);
        line(&mut fb, -1_000_000_000, -1_000_000_000, 1_000_000_000, 1_000_000_000, INK);
        let expected: Vec<_> = (0..16).map(|i| (i, i)).collect();
        assert_eq!(lit(&fb, INK), expected);
    }

    /// Step-by-step error-term walk over every cell of the line.
    fn stepped_line(fb: &mut FrameBuffer, x1: i32, y1: i32, x2: i32, y2: i32, rgb: Rgb) {
        let (x1, y1, x2, y2) = (i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2));
        let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
        let sx = if x2 >= x1 { 1 } else { -1 };
        let sy = if y2 >= y1 { 1 } else { -1 };
        let x_major = dx >= dy;
        let (major, minor) = if x_major { (dx, dy) } else { (dy, dx) };
        let mut err = 2 * minor - major;
        let (mut x, mut y) = (x1, y1);
        for _ in 0..=major {
            plot(fb, x, y, rgb);
            if err > 0 {
                if x_major {
                    y += sy;
                } else {
                    x += sx;
                }
                err -= 2 * major;
            }
            err += 2 * minor;
            if x_major {
                x += sx;
            } else {
                y += sy;
            }
        }
    }

    proptest! {
        #[test]
        fn clipped_line_matches_stepped_walk(
            x1 in -40i32..60,
            y1 in -40i32..60,
            x2 in -40i32..60,
            y2 in -40i32..60,
        ) {
            let mut clipped = FrameBuffer::new(20, 12);
            let mut stepped = FrameBuffer::new(20, 12);
            line(&mut clipped, x1, y1, x2, y2, INK);
            stepped_line(&mut stepped, x1, y1, x2, y2, INK);
            prop_assert_eq!(clipped.pixels(), stepped.pixels());
        }
    }

    #[test]
    fn thin_border_frames_the_fill() {
        let mut fb = FrameBuffer::new(12, 12);
        rect_filled(&mut fb, 0, 0, 6, 6, 1, INK, FILL);
        assert_eq!(lit(&fb, FILL).len(), 16);
        assert_eq!(lit(&fb, INK).len(), 20);
    }
}
