//! End-to-end drawing checks through the public `Display` surface.

use frame_display::text::{layout, wrap_text};
use frame_display::{
    Alignment, Color, DEFAULT_HEIGHT, DEFAULT_PALETTE, DEFAULT_WIDTH, Display, DisplayError, Rgb,
    TextStyle,
};

fn ink(display: &Display, rgb: Rgb) -> usize {
    let argb = rgb.to_argb();
    display.framebuffer().pixels().iter().filter(|&&p| p == argb).count()
}

#[test]
fn default_display_matches_device_geometry() {
    let display = Display::default();
    assert_eq!((display.width(), display.height()), (640, 400));
    assert_eq!((DEFAULT_WIDTH, DEFAULT_HEIGHT), (640, 400));
    assert_eq!(ink(&display, Rgb::new(0, 0, 0)), 640 * 400);
}

#[test]
fn clear_then_pixel_then_show() {
    let mut display = Display::default();
    display.clear(Color::PaletteIndex(1)).unwrap();
    display.set_pixel(0, 0, Color::RgbInt(0xFF0000)).unwrap();
    display.show();
    assert!(display.take_commit());

    let fb = display.framebuffer();
    assert_eq!(fb.pixel(0, 0), Some(Rgb::new(255, 0, 0)));
    assert_eq!(fb.pixel(1, 0), Some(DEFAULT_PALETTE[1]));
    assert_eq!(ink(&display, DEFAULT_PALETTE[1]), 640 * 400 - 1);
}

#[test]
fn out_of_range_colors_are_rejected_everywhere() {
    let mut display = Display::default();
    let bad = [
        Color::PaletteIndex(16),
        Color::PaletteIndex(-1),
        Color::RgbInt(0x100_0000),
        Color::RgbTriple(0, 256, 0),
    ];
    for color in bad {
        assert!(matches!(display.clear(color), Err(DisplayError::InvalidColor(_))));
        assert!(display.set_pixel(1, 1, color).is_err());
        assert!(display.draw_line(0, 0, 10, 10, color).is_err());
        assert!(display.draw_rect(0, 0, 10, 10, color).is_err());
        assert!(display.set_palette(0, color).is_err());
    }
    assert!(!display.framebuffer().is_dirty());
}

#[test]
fn off_screen_drawing_is_clipped_silently() {
    let mut display = Display::default();
    display.set_pixel(-1, 0, Color::PaletteIndex(1)).unwrap();
    display.set_pixel(640, 399, Color::PaletteIndex(1)).unwrap();
    display.draw_line(-100, -100, -1, -50, Color::PaletteIndex(1)).unwrap();
    display.fill_rect(630, 390, 50, 50, Color::PaletteIndex(1)).unwrap();
    assert_eq!(ink(&display, DEFAULT_PALETTE[1]), 100);
}

#[test]
fn extreme_geometry_only_touches_the_grid() {
    let mut display = Display::default();
    let white = Color::PaletteIndex(1);
    display
        .draw_line(-200_000_000, 5, 200_000_000, 5, white)
        .unwrap();
    assert_eq!(ink(&display, DEFAULT_PALETTE[1]), 640);

    let style = TextStyle {
        size: 20_000,
        ..TextStyle::default()
    };
    display.write_text(-5_000, -5_000, "W", &style).unwrap();
    display.write_text(i32::MIN, i32::MAX, "far away", &style).unwrap();
    assert!(ink(&display, DEFAULT_PALETTE[1]) >= 640);
}

#[test]
fn odd_bordered_rect_keeps_its_centre() {
    let mut display = Display::new(8, 8);
    display
        .draw_rect_filled(0, 0, 3, 3, 1, Color::PaletteIndex(1), Color::PaletteIndex(3))
        .unwrap();
    assert_eq!(display.framebuffer().pixel(1, 1), Some(DEFAULT_PALETTE[3]));
    assert_eq!(ink(&display, DEFAULT_PALETTE[1]), 8);
}

#[test]
fn zero_border_equals_fill_rect() {
    let mut a = Display::default();
    let mut b = Display::default();
    a.draw_rect_filled(10, 20, 100, 50, 0, Color::PaletteIndex(3), Color::PaletteIndex(5))
        .unwrap();
    b.fill_rect(10, 20, 100, 50, Color::PaletteIndex(5)).unwrap();
    assert_eq!(a.framebuffer().pixels(), b.framebuffer().pixels());
}

#[test]
fn reset_returns_to_power_on_state() {
    let mut display = Display::default();
    display.assign_color(1, 10, 200, 30).unwrap();
    display.write_text(0, 0, "hello", &TextStyle::default()).unwrap();
    display.reset();

    let fresh = Display::default();
    assert_eq!(display.palette(), fresh.palette());
    assert_eq!(display.framebuffer().pixels(), fresh.framebuffer().pixels());
}

#[test]
fn wrapped_text_lays_out_within_width() {
    let text = "The quick brown fox jumps over the lazy dog";
    let wrapped = wrap_text(text, 200, 30);
    let block = layout(0, 0, &wrapped, 30, Alignment::TopLeft);
    assert!(block.lines.len() > 1);
    for line in &block.lines {
        assert!(line.width <= 200, "{:?} is {} px wide", line.text, line.width);
    }

    let mut display = Display::default();
    let style = TextStyle {
        size: 30,
        color: Color::PaletteIndex(9),
        alignment: Alignment::TopLeft,
    };
    display.write_text(0, 0, &wrapped, &style).unwrap();
    assert!(ink(&display, DEFAULT_PALETTE[9]) > 0);
}
