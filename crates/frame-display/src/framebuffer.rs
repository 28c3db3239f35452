//! The logical pixel grid.
//!
//! Pixels are ARGB32 (`0xFFRRGGBB`), row-major, like every other emulated
//! video chip in this workspace. Writes that fall outside the grid are
//! dropped: scripts routinely draw shapes that hang off the edge of the
//! display.

use crate::color::Rgb;

/// Frame display width in pixels.
pub const DEFAULT_WIDTH: u32 = 640;

/// Frame display height in pixels.
pub const DEFAULT_HEIGHT: u32 = 400;

/// Width × height grid of ARGB32 pixels with a dirty flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    /// Set by every write, cleared by [`FrameBuffer::take_dirty`].
    dirty: bool,
}

impl FrameBuffer {
    /// Create a buffer cleared to black.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "frame buffer dimensions must be non-zero");
        Self {
            width,
            height,
            pixels: vec![Rgb::default().to_argb(); (width * height) as usize],
            dirty: false,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw ARGB32 pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` off-grid.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.index(x, y).map(|i| Rgb::from_argb(self.pixels[i]))
    }

    /// Write one pixel. Off-grid writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, rgb: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = rgb.to_argb();
            self.dirty = true;
        }
    }

    /// Fill the rectangle `[x, x+w) × [y, y+h)`, clipped to the grid.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, rgb: Rgb) {
        if w <= 0 || h <= 0 {
            return;
        }
        let x0 = i64::from(x).max(0);
        let y0 = i64::from(y).max(0);
        let x1 = (i64::from(x) + i64::from(w)).min(i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(h)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let argb = rgb.to_argb();
        let stride = self.width as usize;
        for row in y0 as usize..y1 as usize {
            let start = row * stride;
            self.pixels[start + x0 as usize..start + x1 as usize].fill(argb);
        }
        self.dirty = true;
    }

    /// Fill the whole grid.
    pub fn fill(&mut self, rgb: Rgb) {
        self.pixels.fill(rgb.to_argb());
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = u32::try_from(y).ok().filter(|&y| y < self.height)?;
        Some((y * self.width + x) as usize)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
