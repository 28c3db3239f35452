//! Window and presentation settings.

use std::fs;
use std::path::Path;

use frame_display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::EmuError;

/// Presentation settings. Fixed once the emulator is built.
///
/// Can be read from a JSON file; missing fields take their defaults:
///
/// ```json
/// { "width": 640, "height": 400, "scale": 2, "title": "Frame", "fps": 60 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Logical frame buffer width in pixels.
    pub width: u32,
    /// Logical frame buffer height in pixels.
    pub height: u32,
    /// Initial window size as a multiple of the logical size.
    pub scale: u32,
    pub title: String,
    /// Presentation ticks per second.
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: 1,
            title: "Frame Glasses Emulator".to_string(),
            fps: 60,
        }
    }
}

impl RenderConfig {
    pub const MAX_SCALE: u32 = 10;
    pub const MAX_FPS: u32 = 240;

    /// Reject settings the presentation loop can't honour.
    pub fn validate(&self) -> Result<(), EmuError> {
        if self.width == 0 || self.height == 0 {
            return Err(EmuError::Config(format!(
                "display must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=Self::MAX_SCALE).contains(&self.scale) {
            return Err(EmuError::Config(format!(
                "scale {} outside 1-{}",
                self.scale,
                Self::MAX_SCALE
            )));
        }
        if !(1..=Self::MAX_FPS).contains(&self.fps) {
            return Err(EmuError::Config(format!(
                "fps {} outside 1-{}",
                self.fps,
                Self::MAX_FPS
            )));
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, EmuError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| EmuError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, EmuError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| EmuError::Config(format!("{}: {e}", path.display())))
    }

    /// Initial window size in physical pixels.
    #[must_use]
    pub fn window_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.scale),
            self.height.saturating_mul(self.scale),
        )
    }

    /// Duration of one presentation tick.
    #[must_use]
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1) / self.fps.max(1)
    }
}
