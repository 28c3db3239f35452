//! The display state a guest script draws into.
//!
//! `Display` bundles the palette, the frame buffer, and the commit flag that
//! `show()` raises. Every drawing call resolves its colors first and only
//! then touches pixels, so a call that fails leaves the buffer unchanged.
//!
//! Drawing is immediately visible in [`Display::framebuffer`] but a
//! presentation loop must only composite after [`Display::take_commit`]
//! returns `true`. That two-phase contract mirrors the device, where a
//! script that never calls `show()` never changes what's on the glass.

use log::debug;

use crate::bitmap::{Bitmap, BitmapMode};
use crate::color::{Color, Rgb, resolve};
use crate::error::DisplayError;
use crate::framebuffer::{DEFAULT_HEIGHT, DEFAULT_WIDTH, FrameBuffer};
use crate::palette::{PALETTE_SIZE, Palette};
use crate::raster;
use crate::text::{self, TextStyle};

/// Display controller registers the guest can poke. None of them alter the
/// emulated picture; they are recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegisters {
    /// Brightness step, -2 to 2.
    pub brightness: i8,
    pub power_save: bool,
    /// Raw register file written by `write_register`.
    pub registers: [u8; 256],
}

impl Default for DeviceRegisters {
    fn default() -> Self {
        Self {
            brightness: 0,
            power_save: false,
            registers: [0; 256],
        }
    }
}

/// Palette + frame buffer + commit flag.
#[derive(Debug, Clone)]
pub struct Display {
    palette: Palette,
    framebuffer: FrameBuffer,
    committed: bool,
    registers: DeviceRegisters,
}

impl Display {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            palette: Palette::new(),
            framebuffer: FrameBuffer::new(width, height),
            committed: false,
            registers: DeviceRegisters::default(),
        }
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    #[must_use]
    pub fn registers(&self) -> &DeviceRegisters {
        &self.registers
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.framebuffer.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.framebuffer.height()
    }

    /// Resolve `color` against the current palette.
    pub fn resolve(&self, color: Color) -> Result<Rgb, DisplayError> {
        resolve(color, &self.palette)
    }

    // -----------------------------------------------------------------------
    // Palette
    // -----------------------------------------------------------------------

    /// Overwrite palette slot `index` with the resolved `color`.
    pub fn set_palette(&mut self, index: i64, color: Color) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        self.palette.set(index, rgb)
    }

    /// Store an RGB triple through the device's YCbCr quantization.
    pub fn assign_color(&mut self, index: i64, r: i64, g: i64, b: i64) -> Result<(), DisplayError> {
        let rgb = self.resolve(Color::RgbTriple(r, g, b))?;
        self.palette.assign_color(index, rgb.r, rgb.g, rgb.b)
    }

    pub fn assign_color_ycbcr(
        &mut self,
        index: i64,
        y: i64,
        cb: i64,
        cr: i64,
    ) -> Result<(), DisplayError> {
        self.palette.assign_color_ycbcr(index, y, cb, cr)
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Fill the whole frame buffer.
    pub fn clear(&mut self, color: Color) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        self.framebuffer.fill(rgb);
        Ok(())
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        self.framebuffer.set(x, y, rgb);
        Ok(())
    }

    pub fn draw_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        color: Color,
    ) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        raster::line(&mut self.framebuffer, x1, y1, x2, y2, rgb);
        Ok(())
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        raster::rect_outline(&mut self.framebuffer, x, y, w, h, rgb);
        Ok(())
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color) -> Result<(), DisplayError> {
        let rgb = self.resolve(color)?;
        raster::fill_rect(&mut self.framebuffer, x, y, w, h, rgb);
        Ok(())
    }

    pub fn draw_rect_filled(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        border_width: i32,
        border_color: Color,
        fill_color: Color,
    ) -> Result<(), DisplayError> {
        let border = self.resolve(border_color)?;
        let fill = self.resolve(fill_color)?;
        raster::rect_filled(&mut self.framebuffer, x, y, w, h, border_width, border, fill);
        Ok(())
    }

    /// Draw a packed bitmap with its top-left pixel at `(x, y)`.
    ///
    /// At 1, 2, and 4 bpp each value picks a palette slot: 0 stays slot 0,
    /// anything else is offset by `color`'s palette index, modulo 16. At
    /// 8 bpp each byte is an intensity applied to `color`.
    pub fn bitmap(
        &mut self,
        x: i32,
        y: i32,
        width: i64,
        mode: i64,
        color: Color,
        data: &[u8],
    ) -> Result<(), DisplayError> {
        let bitmap = Bitmap::parse(width, mode, data)?;
        let (x, y) = (i64::from(x), i64::from(y));

        let shade: Box<dyn Fn(u8) -> Rgb> = if bitmap.mode() == BitmapMode::Bpp8 {
            let tint = self.resolve(color)?;
            Box::new(move |v| tint.tinted(v))
        } else {
            let Color::PaletteIndex(offset) = color else {
                return Err(DisplayError::InvalidColor(format!(
                    "{}-bit bitmaps take a palette offset, got {color:?}",
                    bitmap.mode().bits()
                )));
            };
            self.resolve(color)?;
            let mut slots = [Rgb::default(); PALETTE_SIZE];
            for (index, rgb) in slots.iter_mut().enumerate() {
                *rgb = self.resolve(Color::PaletteIndex(index as i64))?;
            }
            Box::new(move |v| {
                let slot = if v == 0 { 0 } else { (usize::from(v) + offset as usize) % PALETTE_SIZE };
                slots[slot]
            })
        };

        for (col, row, value) in bitmap.pixels() {
            let (px, py) = (x + i64::from(col), y + i64::from(row));
            if let (Ok(px), Ok(py)) = (i32::try_from(px), i32::try_from(py)) {
                self.framebuffer.set(px, py, shade(value));
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Text
    // -----------------------------------------------------------------------

    /// Draw `text` as an aligned block anchored at `(x, y)`.
    pub fn write_text(&mut self, x: i32, y: i32, text: &str, style: &TextStyle) -> Result<(), DisplayError> {
        let rgb = self.resolve(style.color)?;
        let layout = text::layout(x, y, text, style.size, style.alignment);
        text::render(&mut self.framebuffer, &layout, rgb);
        Ok(())
    }

    #[must_use]
    pub fn text_width(&self, text: &str, size: u32) -> u32 {
        text::text_width(text, size)
    }

    #[must_use]
    pub fn text_height(&self, text: &str, size: u32) -> u32 {
        text::text_height(text, size)
    }

    #[must_use]
    pub fn wrap_text(&self, text: &str, max_width: u32, size: u32) -> String {
        text::wrap_text(text, max_width, size)
    }

    // -----------------------------------------------------------------------
    // Commit and reset
    // -----------------------------------------------------------------------

    /// Mark the current buffer for presentation at the next tick.
    pub fn show(&mut self) {
        self.committed = true;
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Consume a pending commit. Returns `true` if `show()` was called since
    /// the last take; the caller should snapshot the frame buffer while still
    /// holding whatever lock guards this display.
    pub fn take_commit(&mut self) -> bool {
        if !self.committed {
            return false;
        }
        self.committed = false;
        self.framebuffer.take_dirty();
        true
    }

    /// Restore the power-on palette, clear the buffer to black, and commit
    /// the blank frame so the window reflects the reset.
    pub fn reset(&mut self) {
        debug!("display reset");
        self.palette.reset();
        self.framebuffer.fill(Rgb::default());
        self.registers = DeviceRegisters::default();
        self.committed = true;
    }

    // -----------------------------------------------------------------------
    // Device registers
    // -----------------------------------------------------------------------

    /// Set the brightness step, clamped to -2..=2. Returns the stored level.
    pub fn set_brightness(&mut self, level: i64) -> i8 {
        self.registers.brightness = level.clamp(-2, 2) as i8;
        debug!("brightness set to {}", self.registers.brightness);
        self.registers.brightness
    }

    /// Write an 8-bit value to an 8-bit register address. Both are masked.
    pub fn write_register(&mut self, register: i64, value: i64) {
        let register = (register & 0xFF) as u8;
        let value = (value & 0xFF) as u8;
        self.registers.registers[usize::from(register)] = value;
        debug!("register {register:#04X} set to {value:#04X}");
    }

    pub fn power_save(&mut self, enable: bool) {
        self.registers.power_save = enable;
        debug!("power save {}", if enable { "enabled" } else { "disabled" });
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}
