use std::io;

use frame_display::DisplayError;
use thiserror::Error;

/// Errors surfaced by the emulator outside of a running script.
#[derive(Debug, Error)]
pub enum EmuError {
    /// Guest source failed to compile.
    #[error("script failed to load: {0}")]
    ScriptLoad(String),

    /// Uncaught fault while the script was executing.
    #[error("script fault: {0}")]
    ScriptRuntime(String),

    /// Window or surface creation failed. Not recoverable.
    #[error("graphics context: {0}")]
    GraphicsContext(String),

    #[error("a script is already executing")]
    ScriptBusy,

    #[error("no script loaded")]
    NoScript,

    /// Inbound queue is full; the packet was dropped.
    #[error("inbound queue full ({0} packets pending)")]
    InboundFull(usize),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[cfg(feature = "native")]
    #[error("png encoding: {0}")]
    Png(#[from] png::EncodingError),
}
