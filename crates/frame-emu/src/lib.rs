//! Frame glasses emulator.
//!
//! Runs a guest Lua script against the `frame.*` drawing API on its own
//! thread and presents whatever it commits with `frame.display.show()`.
//! The library side is windowless; the `frame-emu` binary adds the winit
//! window, PNG capture, and the CLI behind the default `native` feature.

mod api;
pub mod config;
pub mod emulator;
pub mod error;
pub mod host;
pub mod present;
pub mod runtime;

#[cfg(feature = "native")]
pub mod capture;
#[cfg(feature = "native")]
pub mod keymap;

pub use api::SCRIPT_LOG_TARGET;
pub use config::RenderConfig;
pub use emulator::{CONTROL_BREAK, CONTROL_RESET, Emulator};
pub use error::EmuError;
pub use host::{Host, INBOUND_CAPACITY, MAX_PACKET_LENGTH, OUTBOUND_CAPACITY};
pub use present::{BACKGROUND, Presenter, Viewport, composite};
pub use runtime::{ScriptRuntime, ScriptState};
