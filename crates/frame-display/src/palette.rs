//! Frame 16-colour palette.
//!
//! The device stores each slot as 10-bit YCbCr (4 bits luma, 3 bits each
//! chroma). Plain `set` writes RGB straight through; `assign_color` and
//! `assign_color_ycbcr` go through the device's quantization so scripts see
//! the same banding they would on hardware.

use crate::color::Rgb;
use crate::error::DisplayError;

/// Number of palette slots.
pub const PALETTE_SIZE: usize = 16;

/// Power-on palette.
pub const DEFAULT_PALETTE: [Rgb; PALETTE_SIZE] = [
    Rgb::new(0, 0, 0),       // 0: VOID
    Rgb::new(255, 255, 255), // 1: WHITE
    Rgb::new(157, 157, 157), // 2: GRAY
    Rgb::new(190, 38, 51),   // 3: RED
    Rgb::new(224, 111, 139), // 4: PINK
    Rgb::new(73, 60, 43),    // 5: DARKBROWN
    Rgb::new(164, 100, 34),  // 6: BROWN
    Rgb::new(235, 137, 49),  // 7: ORANGE
    Rgb::new(247, 226, 107), // 8: YELLOW
    Rgb::new(47, 72, 78),    // 9: DARKGREEN
    Rgb::new(68, 137, 26),   // 10: GREEN
    Rgb::new(163, 206, 39),  // 11: LIGHTGREEN
    Rgb::new(27, 38, 50),    // 12: NIGHTBLUE
    Rgb::new(0, 87, 132),    // 13: SEABLUE
    Rgb::new(49, 162, 242),  // 14: SKYBLUE
    Rgb::new(178, 220, 239), // 15: CLOUDBLUE
];

/// Slot names as exposed to scripts (`frame.display.PaletteColors`).
pub const PALETTE_NAMES: [&str; PALETTE_SIZE] = [
    "VOID",
    "WHITE",
    "GRAY",
    "RED",
    "PINK",
    "DARKBROWN",
    "BROWN",
    "ORANGE",
    "YELLOW",
    "DARKGREEN",
    "GREEN",
    "LIGHTGREEN",
    "NIGHTBLUE",
    "SEABLUE",
    "SKYBLUE",
    "CLOUDBLUE",
];

/// The 16 mutable palette slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; PALETTE_SIZE],
}

impl Palette {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DEFAULT_PALETTE,
        }
    }

    /// Current contents of slot `index`.
    pub fn get(&self, index: i64) -> Result<Rgb, DisplayError> {
        Ok(self.entries[slot(index)?])
    }

    /// Overwrite slot `index`.
    pub fn set(&mut self, index: i64, rgb: Rgb) -> Result<(), DisplayError> {
        self.entries[slot(index)?] = rgb;
        Ok(())
    }

    /// Restore the power-on table.
    pub fn reset(&mut self) {
        self.entries = DEFAULT_PALETTE;
    }

    #[must_use]
    pub fn entries(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.entries
    }

    /// Look up a slot by name (`"red"`, `"SkyBlue"`, ...).
    #[must_use]
    pub fn index_of(name: &str) -> Option<i64> {
        PALETTE_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| i as i64)
    }

    /// Store an RGB color the way the device does: convert to YCbCr,
    /// quantize to 4:3:3 bits, and expand back.
    pub fn assign_color(&mut self, index: i64, r: u8, g: u8, b: u8) -> Result<(), DisplayError> {
        let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
        self.assign_color_ycbcr(index, i64::from(y >> 4), i64::from(cb >> 5), i64::from(cr >> 5))
    }

    /// Store a quantized YCbCr value. `y` is clamped to 0-15, `cb` and `cr`
    /// to 0-7.
    pub fn assign_color_ycbcr(
        &mut self,
        index: i64,
        y: i64,
        cb: i64,
        cr: i64,
    ) -> Result<(), DisplayError> {
        let slot = slot(index)?;
        let y = y.clamp(0, 15) as u8;
        let cb = cb.clamp(0, 7) as u8;
        let cr = cr.clamp(0, 7) as u8;
        self.entries[slot] = ycbcr_to_rgb(expand4(y), expand3(cb), expand3(cr));
        Ok(())
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

fn slot(index: i64) -> Result<usize, DisplayError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < PALETTE_SIZE)
        .ok_or_else(|| DisplayError::InvalidColor(format!("palette index {index} is outside 0-15")))
}

/// Full-range BT.601 RGB → YCbCr, truncated to integers.
fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (to_u8(y), to_u8(cb), to_u8(cr))
}

fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> Rgb {
    let y = f64::from(y);
    let cb = f64::from(cb) - 128.0;
    let cr = f64::from(cr) - 128.0;
    Rgb::new(
        to_u8(y + 1.402 * cr),
        to_u8(y - 0.344_136 * cb - 0.714_136 * cr),
        to_u8(y + 1.772 * cb),
    )
}

fn to_u8(v: f64) -> u8 {
    (v as i32).clamp(0, 255) as u8
}

fn expand4(v: u8) -> u8 {
    (v << 4) | v
}

fn expand3(v: u8) -> u8 {
    (v << 5) | (v << 2) | (v >> 1)
}
