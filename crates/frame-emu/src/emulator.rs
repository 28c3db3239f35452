//! One emulator instance: shared host state plus the script runtime.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::config::RenderConfig;
use crate::error::EmuError;
use crate::host::Host;
use crate::present::Presenter;
use crate::runtime::{ScriptRuntime, ScriptState};

/// Break: stop the running script.
pub const CONTROL_BREAK: u8 = 0x03;
/// Reset: clear the display and restart the loaded script.
pub const CONTROL_RESET: u8 = 0x04;

/// Name given to scripts loaded without one.
const DEFAULT_SCRIPT_NAME: &str = "main.lua";

pub struct Emulator {
    config: RenderConfig,
    host: Arc<Host>,
    runtime: ScriptRuntime,
}

impl Emulator {
    pub fn new(config: RenderConfig) -> Result<Self, EmuError> {
        config.validate()?;
        let host = Arc::new(Host::new(&config));
        let runtime = ScriptRuntime::new(Arc::clone(&host));
        Ok(Self {
            config,
            host,
            runtime,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    /// A presenter sized for this instance's frame buffer.
    #[must_use]
    pub fn presenter(&self) -> Presenter {
        Presenter::new(self.config.width, self.config.height)
    }

    // -----------------------------------------------------------------------
    // Script lifecycle
    // -----------------------------------------------------------------------

    pub fn load(&mut self, source: &str) -> Result<(), EmuError> {
        self.runtime.load(DEFAULT_SCRIPT_NAME, source)
    }

    pub fn load_named(&mut self, name: &str, source: &str) -> Result<(), EmuError> {
        self.runtime.load(name, source)
    }

    pub fn start(&mut self) -> Result<(), EmuError> {
        self.runtime.start()
    }

    /// Load and start in one step.
    pub fn run(&mut self, source: &str) -> Result<(), EmuError> {
        self.load(source)?;
        self.start()
    }

    pub fn stop(&mut self) {
        self.runtime.stop();
    }

    pub fn reset(&mut self) {
        self.runtime.reset();
    }

    pub fn state(&mut self) -> ScriptState {
        self.runtime.poll()
    }

    /// Block until the script stops executing or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> ScriptState {
        self.runtime.wait(timeout)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.runtime.last_error()
    }

    // -----------------------------------------------------------------------
    // Collaborator entry points
    // -----------------------------------------------------------------------

    /// Hand a raw packet from the transport to the script.
    ///
    /// The single-byte packets `0x03` and `0x04` are control signals and are
    /// acted on here. Anything else is queued, in order, for the script's
    /// receive callback.
    pub fn deliver_inbound(&mut self, packet: &[u8]) -> Result<(), EmuError> {
        match packet {
            [CONTROL_BREAK] => {
                info!("break signal received");
                self.stop();
                Ok(())
            }
            [CONTROL_RESET] => {
                info!("reset signal received");
                self.reset();
                if self.runtime.has_script() {
                    self.start()
                } else {
                    Ok(())
                }
            }
            _ => self.host.push_inbound(packet.to_vec()),
        }
    }

    pub fn set_key(&self, name: &str, pressed: bool) {
        self.host.set_key(name, pressed);
    }

    #[must_use]
    pub fn is_key_pressed(&self, name: &str) -> bool {
        self.host.is_key_pressed(name)
    }

    /// Packets the script has sent with `frame.bluetooth.send`.
    pub fn take_outbound(&self) -> Vec<Vec<u8>> {
        self.host.take_outbound()
    }
}
