//! Headless capture: PNG screenshots of the presented frame.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use log::info;

use crate::error::EmuError;
use crate::present::Presenter;

/// Encode an RGBA8 image as PNG.
pub fn save_png(path: &Path, rgba: &[u8], width: u32, height: u32) -> Result<(), EmuError> {
    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;
    Ok(())
}

/// Save the presenter's front frame at logical resolution.
pub fn save_screenshot(presenter: &Presenter, path: &Path) -> Result<(), EmuError> {
    save_png(path, &presenter.to_rgba(), presenter.width(), presenter.height())?;
    info!("screenshot saved to {}", path.display());
    Ok(())
}
