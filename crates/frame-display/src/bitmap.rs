//! Packed bitmap decoding.
//!
//! Bitmaps arrive as a row-major byte stream at 1, 2, 4, or 8 bits per
//! pixel. Pixels are packed MSB-first and every row starts on a byte
//! boundary, so a row occupies `ceil(width * bpp / 8)` bytes and the height
//! falls out of the data length.

use crate::error::DisplayError;

/// Bits per pixel of a packed bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapMode {
    Bpp1,
    Bpp2,
    Bpp4,
    Bpp8,
}

impl BitmapMode {
    /// Parse a guest-supplied bit depth.
    pub fn from_bits(bits: i64) -> Result<Self, DisplayError> {
        match bits {
            1 => Ok(Self::Bpp1),
            2 => Ok(Self::Bpp2),
            4 => Ok(Self::Bpp4),
            8 => Ok(Self::Bpp8),
            other => Err(DisplayError::InvalidBitmapFormat(format!(
                "unsupported mode {other} (expected 1, 2, 4, or 8 bits per pixel)"
            ))),
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Bpp1 => 1,
            Self::Bpp2 => 2,
            Self::Bpp4 => 4,
            Self::Bpp8 => 8,
        }
    }

    /// Bytes per row for a bitmap `width` pixels wide.
    #[must_use]
    pub const fn row_bytes(self, width: u32) -> usize {
        (width as usize * self.bits() as usize).div_ceil(8)
    }
}

/// A validated view over packed bitmap data.
#[derive(Debug, Clone, Copy)]
pub struct Bitmap<'a> {
    width: u32,
    height: u32,
    mode: BitmapMode,
    data: &'a [u8],
}

impl<'a> Bitmap<'a> {
    /// Validate `data` as rows of `width` pixels at `mode` bits per pixel.
    pub fn parse(width: i64, mode: i64, data: &'a [u8]) -> Result<Self, DisplayError> {
        let mode = BitmapMode::from_bits(mode)?;
        let width = u32::try_from(width)
            .ok()
            .filter(|&w| w > 0)
            .ok_or_else(|| {
                DisplayError::InvalidBitmapFormat(format!("width {width} must be positive"))
            })?;

        let row_bytes = mode.row_bytes(width);
        if data.len() % row_bytes != 0 {
            return Err(DisplayError::InvalidBitmapFormat(format!(
                "{} bytes is not a whole number of {row_bytes}-byte rows",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height: (data.len() / row_bytes) as u32,
            mode,
            data,
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn mode(&self) -> BitmapMode {
        self.mode
    }

    /// Decoded value of pixel `(col, row)`. Both must be in range.
    #[must_use]
    pub fn value(&self, col: u32, row: u32) -> u8 {
        let bits = self.mode.bits() as usize;
        let bit_offset = col as usize * bits;
        let byte = self.data[row as usize * self.mode.row_bytes(self.width) + bit_offset / 8];
        let shift = 8 - bits - bit_offset % 8;
        let mask = ((1u16 << bits) - 1) as u8;
        (byte >> shift) & mask
    }

    /// Iterate `(col, row, value)` over every pixel, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, u8)> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |col| (col, row, self.value(col, row))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_modes_are_rejected() {
        for mode in [0, 3, 16, -1] {
            assert!(matches!(
                Bitmap::parse(8, mode, &[0]),
                Err(DisplayError::InvalidBitmapFormat(_))
            ));
        }
    }

    #[test]
    fn ragged_data_is_rejected() {
        // 10 px at 1 bpp = 2 bytes per row.
        assert!(Bitmap::parse(10, 1, &[0, 0, 0]).is_err());
        assert!(Bitmap::parse(10, 1, &[0, 0, 0, 0]).is_ok());
        assert!(Bitmap::parse(0, 1, &[0]).is_err());
    }

    #[test]
    fn height_derives_from_length() {
        let data = [0u8; 12];
        assert_eq!(Bitmap::parse(8, 1, &data).unwrap().height(), 12);
        assert_eq!(Bitmap::parse(8, 2, &data).unwrap().height(), 6);
        assert_eq!(Bitmap::parse(8, 4, &data).unwrap().height(), 3);
        assert_eq!(Bitmap::parse(3, 8, &data).unwrap().height(), 4);
    }

    #[test]
    fn one_bit_pixels_are_msb_first() {
        let bitmap = Bitmap::parse(8, 1, &[0b1000_0001]).unwrap();
        let values: Vec<u8> = (0..8).map(|c| bitmap.value(c, 0)).collect();
        assert_eq!(values, vec![1, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn two_and_four_bit_pixels_unpack() {
        let bitmap = Bitmap::parse(4, 2, &[0b11_10_01_00]).unwrap();
        let values: Vec<u8> = (0..4).map(|c| bitmap.value(c, 0)).collect();
        assert_eq!(values, vec![3, 2, 1, 0]);

        let bitmap = Bitmap::parse(2, 4, &[0xA5]).unwrap();
        assert_eq!((bitmap.value(0, 0), bitmap.value(1, 0)), (0xA, 0x5));
    }

    #[test]
    fn rows_are_byte_aligned() {
        // 3 px at 4 bpp = 2 bytes per row; the low nibble of byte 1 is padding.
        let bitmap = Bitmap::parse(3, 4, &[0x12, 0x3F, 0x45, 0x6F]).unwrap();
        let rows: Vec<Vec<u8>> = (0..2)
            .map(|r| (0..3).map(|c| bitmap.value(c, r)).collect())
            .collect();
        assert_eq!(rows, vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(bitmap.pixels().count(), 6);
    }
}
