//! Text measurement, word wrapping, and aligned block layout.
//!
//! A text block is the set of `\n`-separated lines. Its width is the widest
//! line and its height is one line pitch per line. Alignment picks a single
//! anchor offset for the whole block; every line then shares the block's
//! horizontal alignment.

use crate::color::{Color, Rgb};
use crate::font::{self, REFERENCE_SIZE};
use crate::framebuffer::FrameBuffer;

/// Size used when a script omits one.
pub const DEFAULT_TEXT_SIZE: u32 = REFERENCE_SIZE;

/// Palette slot used when a script omits a text color (WHITE).
pub const DEFAULT_TEXT_COLOR: Color = Color::PaletteIndex(1);

/// Anchor of a text block relative to its `(x, y)` position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Horizontal {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vertical {
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::MiddleLeft,
        Self::MiddleCenter,
        Self::MiddleRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Script-facing name, e.g. `"middle_center"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top_left",
            Self::TopCenter => "top_center",
            Self::TopRight => "top_right",
            Self::MiddleLeft => "middle_left",
            Self::MiddleCenter => "middle_center",
            Self::MiddleRight => "middle_right",
            Self::BottomLeft => "bottom_left",
            Self::BottomCenter => "bottom_center",
            Self::BottomRight => "bottom_right",
        }
    }

    /// Parse a name in either case (`"top_left"` or `"TOP_LEFT"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(name))
    }

    fn horizontal(self) -> Horizontal {
        match self {
            Self::TopLeft | Self::MiddleLeft | Self::BottomLeft => Horizontal::Left,
            Self::TopCenter | Self::MiddleCenter | Self::BottomCenter => Horizontal::Center,
            Self::TopRight | Self::MiddleRight | Self::BottomRight => Horizontal::Right,
        }
    }

    fn vertical(self) -> Vertical {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => Vertical::Top,
            Self::MiddleLeft | Self::MiddleCenter | Self::MiddleRight => Vertical::Middle,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => Vertical::Bottom,
        }
    }
}

/// Size, color, and alignment for one `write_text` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    pub size: u32,
    pub color: Color,
    pub alignment: Alignment,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: DEFAULT_TEXT_SIZE,
            color: DEFAULT_TEXT_COLOR,
            alignment: Alignment::TopLeft,
        }
    }
}

/// Width of a single line (no `\n`) at `size`.
#[must_use]
pub fn line_width(line: &str, size: u32) -> u32 {
    line.chars()
        .filter(|&c| c != '\r')
        .fold(0u32, |w, c| w.saturating_add(font::advance(c, size)))
}

/// Width of the widest line in `text`.
#[must_use]
pub fn text_width(text: &str, size: u32) -> u32 {
    text.split('\n')
        .map(|line| line_width(line, size))
        .max()
        .unwrap_or(0)
}

/// Height of `text`: one line pitch per line.
#[must_use]
pub fn text_height(text: &str, size: u32) -> u32 {
    let lines = text.split('\n').count() as u32;
    lines.saturating_mul(font::line_height(size))
}

/// Greedy word wrap.
///
/// Explicit line breaks are kept. A line that already fits is copied
/// verbatim; otherwise its whitespace-separated words are packed onto lines
/// while `current + space + word <= max_width`, and a word wider than
/// `max_width` on its own is split between characters. Because every emitted
/// line fits, wrapping an already wrapped string returns it unchanged.
#[must_use]
pub fn wrap_text(text: &str, max_width: u32, size: u32) -> String {
    let space = font::advance(' ', size);
    let mut out: Vec<String> = Vec::new();

    for line in text.split('\n') {
        if line_width(line, size) <= max_width {
            out.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0u32;
        for word in line.split_whitespace() {
            let word_width = line_width(word, size);
            if !current.is_empty() {
                let joined = current_width.saturating_add(space).saturating_add(word_width);
                if joined <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width = joined;
                    continue;
                }
                out.push(std::mem::take(&mut current));
            }

            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
            } else {
                current_width = hard_split(word, max_width, size, &mut out, &mut current);
            }
        }
        out.push(current);
    }

    out.join("\n")
}

/// Break an oversized word into chunks that fit. Full chunks go to `out`;
/// the tail is left in `tail` so following words can join it. Returns the
/// tail's width.
fn hard_split(
    word: &str,
    max_width: u32,
    size: u32,
    out: &mut Vec<String>,
    tail: &mut String,
) -> u32 {
    let mut width = 0u32;
    for ch in word.chars() {
        let w = font::advance(ch, size);
        // A single glyph wider than the limit still gets a line of its own.
        if !tail.is_empty() && width.saturating_add(w) > max_width {
            out.push(std::mem::take(tail));
            width = 0;
        }
        tail.push(ch);
        width = width.saturating_add(w);
    }
    width
}

/// Bounding box of a laid-out text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBlock {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Position of one line within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLayout<'a> {
    pub text: &'a str,
    pub x: i64,
    pub y: i64,
    pub width: u32,
}

/// A text block anchored at a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout<'a> {
    pub block: TextBlock,
    pub lines: Vec<LineLayout<'a>>,
    pub size: u32,
}

/// Lay out `text` so that the block's `alignment` anchor lands on `(x, y)`.
#[must_use]
pub fn layout(x: i32, y: i32, text: &str, size: u32, alignment: Alignment) -> TextLayout<'_> {
    let (x, y) = (i64::from(x), i64::from(y));
    let pitch = i64::from(font::line_height(size));
    let width = text_width(text, size);
    let height = text_height(text, size);

    let offset = |anchor: i64, extent: u32, h: Horizontal| match h {
        Horizontal::Left => anchor,
        Horizontal::Center => anchor - i64::from(extent / 2),
        Horizontal::Right => anchor - i64::from(extent),
    };

    let horizontal = alignment.horizontal();
    let top = match alignment.vertical() {
        Vertical::Top => y,
        Vertical::Middle => y - i64::from(height / 2),
        Vertical::Bottom => y - i64::from(height),
    };

    let lines = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            let line_w = line_width(line, size);
            LineLayout {
                text: line,
                x: offset(x, line_w, horizontal),
                y: top + i as i64 * pitch,
                width: line_w,
            }
        })
        .collect();

    TextLayout {
        block: TextBlock {
            x: offset(x, width, horizontal),
            y: top,
            width,
            height,
        },
        lines,
        size,
    }
}

/// Draw a laid-out block.
pub(crate) fn render(fb: &mut FrameBuffer, layout: &TextLayout<'_>, rgb: Rgb) {
    for line in &layout.lines {
        let mut pen = line.x;
        for ch in line.text.chars().filter(|&c| c != '\r') {
            font::draw_glyph(fb, pen, line.y, ch, layout.size, rgb);
            pen += i64::from(font::advance(ch, layout.size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SIZE: u32 = DEFAULT_TEXT_SIZE;

    #[test]
    fn alignment_names_round_trip() {
        for a in Alignment::ALL {
            assert_eq!(Alignment::from_name(a.name()), Some(a));
            assert_eq!(Alignment::from_name(&a.name().to_uppercase()), Some(a));
        }
        assert_eq!(Alignment::from_name("centre"), None);
    }

    #[test]
    fn width_is_widest_line_and_height_counts_lines() {
        let text = "ab\nabcd\n";
        assert_eq!(text_width(text, SIZE), line_width("abcd", SIZE));
        assert_eq!(text_height(text, SIZE), 3 * 60);
        assert_eq!(text_height("", SIZE), 60);
    }

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(wrap_text("hi there", 1000, SIZE), "hi there");
        assert_eq!(wrap_text("", 10, SIZE), "");
    }

    #[test]
    fn words_pack_greedily() {
        // "aa" = 46, space = 17: "aa aa" = 109, "aa aa aa" = 172.
        assert_eq!(wrap_text("aa aa aa aa", 110, SIZE), "aa aa\naa aa");
        assert_eq!(wrap_text("aa aa aa aa", 108, SIZE), "aa\naa\naa\naa");
    }

    #[test]
    fn explicit_breaks_are_preserved() {
        assert_eq!(wrap_text("aa\n\naa aa aa", 110, SIZE), "aa\n\naa aa\naa");
    }

    #[test]
    fn oversized_word_is_hard_split() {
        // Each 'm' advances 32 px: three fit in 100.
        let wrapped = wrap_text("mmmmmmm", 100, SIZE);
        assert_eq!(wrapped, "mmm\nmmm\nm");
    }

    #[test]
    fn hard_split_tail_accepts_following_words() {
        assert_eq!(wrap_text("mmmm i", 100, SIZE), "mmm\nm i");
    }

    #[test]
    fn giant_sizes_wrap_without_overflow() {
        // "a" advances 1.84e9 px and a space 1.36e9 here, so two words
        // with a space between them overflow u32 while two letters do not.
        assert_eq!(wrap_text("a a a", u32::MAX - 1, 4_000_000_000), "a\na\na");
        assert_eq!(wrap_text("aaa", u32::MAX - 1, 4_000_000_000), "aa\na");
    }

    #[test]
    fn top_left_places_block_corner_at_anchor() {
        let l = layout(100, 50, "Hello\nWorld!", SIZE, Alignment::TopLeft);
        assert_eq!((l.block.x, l.block.y), (100, 50));
        assert_eq!(l.lines[0].x, 100);
        assert_eq!(l.lines[1].y, 110);
    }

    #[test]
    fn middle_center_centres_block_on_anchor() {
        for text in ["x", "Hello", "a much longer line of text\nand two"] {
            let l = layout(320, 200, text, SIZE, Alignment::MiddleCenter);
            assert_eq!(l.block.x + i64::from(l.block.width / 2), 320, "{text:?}");
            assert_eq!(l.block.y + i64::from(l.block.height / 2), 200, "{text:?}");
        }
    }

    #[test]
    fn bottom_right_ends_block_at_anchor() {
        let l = layout(600, 380, "ab\nabcdef", SIZE, Alignment::BottomRight);
        assert_eq!(l.block.x + i64::from(l.block.width), 600);
        assert_eq!(l.block.y + i64::from(l.block.height), 380);
        for line in &l.lines {
            assert_eq!(line.x + i64::from(line.width), 600);
        }
    }

    #[test]
    fn rendered_text_stays_inside_block() {
        let mut fb = FrameBuffer::new(640, 400);
        let l = layout(320, 200, "Frame\nglasses", 30, Alignment::MiddleCenter);
        let ink = Rgb::new(255, 255, 255);
        render(&mut fb, &l, ink);
        assert!(fb.is_dirty());
        for y in 0..400 {
            for x in 0..640 {
                if fb.pixel(x, y) == Some(ink) {
                    let (x, y) = (i64::from(x), i64::from(y));
                    assert!(x >= l.block.x && x < l.block.x + i64::from(l.block.width));
                    assert!(y >= l.block.y && y < l.block.y + i64::from(l.block.height));
                }
            }
        }
    }

    fn widest_advance(size: u32) -> u32 {
        (' '..='~').map(|c| font::advance(c, size)).max().unwrap_or(1)
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit(text in "[a-zA-Z ,.!%\n]{0,80}", extra in 0u32..400, size in 10u32..80) {
            let max_width = widest_advance(size) + extra;
            let wrapped = wrap_text(&text, max_width, size);
            for line in wrapped.split('\n') {
                prop_assert!(line_width(line, size) <= max_width, "{line:?} exceeds {max_width}");
            }
        }

        #[test]
        fn wrapping_is_idempotent(text in "[a-zA-Z ,.!%\n]{0,80}", max_width in 0u32..500) {
            let once = wrap_text(&text, max_width, SIZE);
            let twice = wrap_text(&once, max_width, SIZE);
            prop_assert_eq!(once, twice);
        }
    }
}
