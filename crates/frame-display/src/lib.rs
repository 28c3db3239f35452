//! Display engine for the Frame glasses emulator.
//!
//! Owns everything a guest script can draw into: the 16-slot palette, the
//! 640×400 frame buffer, the primitive rasterizer, and the text engine.
//! Nothing here knows about threads or windows. The emulator crate wraps a
//! [`Display`] in a mutex and hands committed frames to the presentation loop.

mod bitmap;
mod color;
mod display;
mod error;
mod font;
mod framebuffer;
mod palette;
pub mod raster;
pub mod text;

pub use bitmap::{Bitmap, BitmapMode};
pub use color::{Color, Rgb, resolve};
pub use display::{DeviceRegisters, Display};
pub use error::DisplayError;
pub use font::{REFERENCE_SIZE, advance, glyph_width, line_height};
pub use framebuffer::{DEFAULT_HEIGHT, DEFAULT_WIDTH, FrameBuffer};
pub use palette::{DEFAULT_PALETTE, PALETTE_NAMES, PALETTE_SIZE, Palette};
pub use text::{Alignment, TextStyle};
