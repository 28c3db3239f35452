//! Script lifecycle and the script worker thread.
//!
//! ```text
//! Idle --load--> Loaded --start--> Executing --+--> Stopped
//!                  ^                           +--> Errored
//!                  +-----------reset-----------+
//! ```
//!
//! Each `start` builds a fresh Lua state on a new thread, so nothing a
//! previous run left in globals survives a reset.

use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use frame_display::Display;
use log::{error, info};
use mlua::{HookTriggers, Lua, VmState};

use crate::api::{self, ScriptContext};
use crate::error::EmuError;
use crate::host::Host;

/// VM instructions between stop-flag checks inside pure Lua code.
const HOOK_INTERVAL: u32 = 1000;

/// How long the idle loop waits for a packet before re-checking the stop flag.
const INBOUND_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Idle,
    Loaded,
    Executing,
    Stopped,
    Errored,
}

/// How the worker thread finished.
#[derive(Debug)]
enum Outcome {
    Finished,
    Stopped,
    Faulted(String),
}

#[derive(Debug, Clone)]
struct Script {
    name: String,
    source: String,
}

/// Owns the loaded script and at most one worker thread.
pub struct ScriptRuntime {
    host: Arc<Host>,
    script: Option<Script>,
    state: ScriptState,
    worker: Option<JoinHandle<Outcome>>,
    last_error: Option<String>,
}

impl ScriptRuntime {
    #[must_use]
    pub fn new(host: Arc<Host>) -> Self {
        Self {
            host,
            script: None,
            state: ScriptState::Idle,
            worker: None,
            last_error: None,
        }
    }

    /// Compile-check `source` and keep it for `start`.
    ///
    /// A syntax error discards any previously loaded script and returns the
    /// runtime to `Idle`.
    pub fn load(&mut self, name: &str, source: &str) -> Result<(), EmuError> {
        if self.poll() == ScriptState::Executing {
            return Err(EmuError::ScriptBusy);
        }

        let check = Lua::new();
        if let Err(e) = check.load(source).set_name(name).into_function() {
            let message = e.to_string();
            error!("{name}: {message}");
            self.script = None;
            self.state = ScriptState::Idle;
            self.last_error = Some(message.clone());
            return Err(EmuError::ScriptLoad(message));
        }

        info!("loaded {name} ({} bytes)", source.len());
        self.script = Some(Script {
            name: name.to_string(),
            source: source.to_string(),
        });
        self.state = ScriptState::Loaded;
        self.last_error = None;
        Ok(())
    }

    /// Run the loaded script on a new worker thread.
    pub fn start(&mut self) -> Result<(), EmuError> {
        if self.poll() == ScriptState::Executing {
            return Err(EmuError::ScriptBusy);
        }
        let script = self.script.clone().ok_or(EmuError::NoScript)?;

        self.host.clear_stop();
        let host = Arc::clone(&self.host);
        let worker = thread::Builder::new()
            .name("frame-script".to_string())
            .spawn(move || execute(&host, &script))?;

        self.worker = Some(worker);
        self.state = ScriptState::Executing;
        self.last_error = None;
        Ok(())
    }

    /// Ask the script to stop and wait for its thread to exit.
    pub fn stop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.host.request_stop();
        self.join();
    }

    /// Stop, restore the display to power-on state, and return to `Loaded`
    /// (or `Idle` if nothing was ever loaded).
    pub fn reset(&mut self) {
        self.stop();
        self.host.discard_inbound();
        self.host.with_display(Display::reset);
        self.host.clear_stop();
        self.last_error = None;
        self.state = if self.script.is_some() {
            ScriptState::Loaded
        } else {
            ScriptState::Idle
        };
        info!("runtime reset");
    }

    /// Current state, reaping the worker if it has finished.
    pub fn poll(&mut self) -> ScriptState {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join();
        }
        self.state
    }

    /// Block until the script leaves `Executing` or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> ScriptState {
        let deadline = Instant::now() + timeout;
        while self.poll() == ScriptState::Executing && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        self.state
    }

    #[must_use]
    pub fn state(&self) -> ScriptState {
        self.state
    }

    #[must_use]
    pub fn has_script(&self) -> bool {
        self.script.is_some()
    }

    /// Message of the most recent load or runtime failure.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn join(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let outcome = worker.join().unwrap_or_else(|_| {
            Outcome::Faulted("script thread panicked".to_string())
        });
        self.state = match outcome {
            Outcome::Finished | Outcome::Stopped => ScriptState::Stopped,
            Outcome::Faulted(message) => {
                self.last_error = Some(message);
                ScriptState::Errored
            }
        };
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker thread body.
fn execute(host: &Arc<Host>, script: &Script) -> Outcome {
    let lua = Lua::new();
    let ctx = Rc::new(ScriptContext::new(Arc::clone(host)));

    let result = api::install(&lua, &ctx)
        .map(|()| install_stop_hook(&lua, host))
        .and_then(|()| {
            lua.load(script.source.as_str())
                .set_name(script.name.as_str())
                .exec()
        })
        .and_then(|()| serve_inbound(&lua, &ctx));

    match result {
        Ok(()) => {
            info!("{} finished", script.name);
            Outcome::Finished
        }
        Err(_) if host.stop_requested() => {
            info!("{} stopped", script.name);
            Outcome::Stopped
        }
        Err(e) => {
            let message = e.to_string();
            error!("{}: {message}", script.name);
            Outcome::Faulted(message)
        }
    }
}

/// Check the stop flag every few VM instructions so loops that never call
/// into the host can still be stopped.
fn install_stop_hook(lua: &Lua, host: &Arc<Host>) {
    let host = Arc::clone(host);
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(HOOK_INTERVAL),
        move |_, _| {
            if host.stop_requested() {
                Err(api::interrupted())
            } else {
                Ok(VmState::Continue)
            }
        },
    );
}

/// After the main chunk returns, keep delivering packets while a receive
/// callback is registered.
fn serve_inbound(lua: &Lua, ctx: &ScriptContext) -> mlua::Result<()> {
    if ScriptContext::has_receive_callback(lua)? {
        info!("main chunk returned, waiting for inbound data");
    }
    while ScriptContext::has_receive_callback(lua)? {
        ctx.check_stop()?;
        ctx.wait_inbound(lua, INBOUND_POLL)?;
    }
    Ok(())
}
