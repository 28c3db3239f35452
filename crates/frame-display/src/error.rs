//! Errors raised by individual drawing calls.

use thiserror::Error;

/// A single primitive call failed. The frame buffer is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Malformed or out-of-range color encoding.
    #[error("invalid color: {0}")]
    InvalidColor(String),
    /// Unsupported bitmap mode or a data length that doesn't divide into rows.
    #[error("invalid bitmap format: {0}")]
    InvalidBitmapFormat(String),
}
