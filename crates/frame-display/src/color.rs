//! Color encodings and resolution to canonical RGB.
//!
//! Guest scripts pass colors three ways: a palette slot number, a packed
//! 24-bit integer, or an `{r, g, b}` table. [`Color`] keeps the raw integers
//! exactly as the guest supplied them; validation happens once, in
//! [`resolve`], so every primitive rejects bad input the same way.

use std::fmt;

use crate::error::DisplayError;
use crate::palette::Palette;

/// Canonical 8-bit-per-channel color.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Split a packed `0xRRGGBB` value. Bits above 24 are ignored.
    #[must_use]
    pub const fn from_u24(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    /// Pack as `0xRRGGBB`.
    #[must_use]
    pub const fn to_u24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Pack as opaque ARGB32, the frame buffer's storage format.
    #[must_use]
    pub const fn to_argb(self) -> u32 {
        0xFF00_0000 | self.to_u24()
    }

    /// Unpack an ARGB32 pixel. Alpha is discarded.
    #[must_use]
    pub const fn from_argb(argb: u32) -> Self {
        Self::from_u24(argb)
    }

    /// Scale every channel by `intensity / 255`.
    #[must_use]
    pub const fn tinted(self, intensity: u8) -> Self {
        let i = intensity as u16;
        Self {
            r: ((self.r as u16 * i) / 255) as u8,
            g: ((self.g as u16 * i) / 255) as u8,
            b: ((self.b as u16 * i) / 255) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.to_u24())
    }
}

/// A color as supplied by a guest script, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Palette slot, valid range 0-15.
    PaletteIndex(i64),
    /// Packed `0xRRGGBB`, valid range 0-0xFFFFFF.
    RgbInt(i64),
    /// Separate channels, each valid in 0-255.
    RgbTriple(i64, i64, i64),
}

impl Color {
    /// Classify a bare guest integer: 0-15 names a palette slot, anything
    /// else is a packed RGB value.
    ///
    /// This means pure RGB values below 16 (near-black blues) can't be
    /// expressed as integers; use a triple instead.
    #[must_use]
    pub const fn from_guest_int(value: i64) -> Self {
        if value >= 0 && value < 16 {
            Self::PaletteIndex(value)
        } else {
            Self::RgbInt(value)
        }
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::RgbTriple(i64::from(rgb.r), i64::from(rgb.g), i64::from(rgb.b))
    }
}

/// Resolve a guest color against the live palette.
///
/// Pure given the palette contents: palette lookups always read the current
/// entry, so a `set` is visible to the very next resolution.
pub fn resolve(color: Color, palette: &Palette) -> Result<Rgb, DisplayError> {
    match color {
        Color::PaletteIndex(index) => palette.get(index),
        Color::RgbInt(value) => {
            if (0..=0xFF_FFFF).contains(&value) {
                Ok(Rgb::from_u24(value as u32))
            } else {
                Err(DisplayError::InvalidColor(format!(
                    "RGB value {value:#X} is outside 0x000000-0xFFFFFF"
                )))
            }
        }
        Color::RgbTriple(r, g, b) => Ok(Rgb::new(
            channel(r, 'r')?,
            channel(g, 'g')?,
            channel(b, 'b')?,
        )),
    }
}

fn channel(value: i64, name: char) -> Result<u8, DisplayError> {
    u8::try_from(value).map_err(|_| {
        DisplayError::InvalidColor(format!("channel {name}={value} is outside 0-255"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rgb_int_splits_high_mid_low_bytes() {
        let palette = Palette::new();
        let rgb = resolve(Color::RgbInt(0x12_34_56), &palette).unwrap();
        assert_eq!(rgb, Rgb::new(0x12, 0x34, 0x56));
    }

    #[test]
    fn out_of_range_encodings_are_rejected() {
        let palette = Palette::new();
        for color in [
            Color::RgbInt(-1),
            Color::RgbInt(0x100_0000),
            Color::RgbTriple(256, 0, 0),
            Color::RgbTriple(0, -1, 0),
            Color::PaletteIndex(16),
            Color::PaletteIndex(-1),
        ] {
            assert!(
                matches!(resolve(color, &palette), Err(DisplayError::InvalidColor(_))),
                "{color:?} should be rejected"
            );
        }
    }

    #[test]
    fn small_guest_ints_name_palette_slots() {
        assert_eq!(Color::from_guest_int(0), Color::PaletteIndex(0));
        assert_eq!(Color::from_guest_int(15), Color::PaletteIndex(15));
        assert_eq!(Color::from_guest_int(16), Color::RgbInt(16));
        assert_eq!(Color::from_guest_int(0xFF0000), Color::RgbInt(0xFF0000));
        assert_eq!(Color::from_guest_int(-3), Color::RgbInt(-3));
    }

    #[test]
    fn tint_scales_channels() {
        let white = Rgb::new(255, 255, 255);
        assert_eq!(white.tinted(255), white);
        assert_eq!(white.tinted(0), Rgb::new(0, 0, 0));
        assert_eq!(Rgb::new(200, 100, 50).tinted(128), Rgb::new(100, 50, 25));
    }

    proptest! {
        #[test]
        fn every_24_bit_value_round_trips(v in 0u32..=0xFF_FFFF) {
            let palette = Palette::new();
            let rgb = resolve(Color::RgbInt(i64::from(v)), &palette).unwrap();
            prop_assert_eq!(rgb.to_u24(), v);
            prop_assert_eq!(Rgb::from_argb(rgb.to_argb()), rgb);
        }

        #[test]
        fn palette_lookup_sees_latest_set(index in 0i64..16, v in 0u32..=0xFF_FFFF) {
            let mut palette = Palette::new();
            palette.set(index, Rgb::from_u24(v)).unwrap();
            prop_assert_eq!(
                resolve(Color::PaletteIndex(index), &palette).unwrap(),
                Rgb::from_u24(v)
            );
        }
    }
}
