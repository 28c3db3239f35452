//! State shared between the script thread and the presentation thread.
//!
//! One `Host` lives behind an `Arc` per emulator instance. The display sits
//! behind a single mutex; every host call holds it for one primitive and
//! releases it before returning to the script. Key state is read far more
//! often than written, so it gets an `RwLock`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use frame_display::Display;
use log::{debug, warn};

use crate::config::RenderConfig;
use crate::error::EmuError;

/// Capacity of the inbound packet queue.
pub const INBOUND_CAPACITY: usize = 64;

/// Largest payload `frame.bluetooth.send` accepts.
pub const MAX_PACKET_LENGTH: usize = 247;

/// Sent packets kept for the transport before the oldest is dropped.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Emulator-wide shared state.
pub struct Host {
    display: Mutex<Display>,
    keys: RwLock<HashSet<String>>,
    stop: AtomicBool,
    started: Instant,
    inbound_tx: SyncSender<Vec<u8>>,
    inbound_rx: Mutex<Receiver<Vec<u8>>>,
    outbound: Mutex<VecDeque<Vec<u8>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
}

/// Recover the guard from a poisoned lock. A panic on the script thread
/// mid-primitive leaves the buffer in a drawable state, so carrying on is fine.
fn relock<T>(result: Result<T, PoisonError<T>>) -> T {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl Host {
    #[must_use]
    pub fn new(config: &RenderConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::sync_channel(INBOUND_CAPACITY);
        Self {
            display: Mutex::new(Display::new(config.width, config.height)),
            keys: RwLock::new(HashSet::new()),
            stop: AtomicBool::new(false),
            started: Instant::now(),
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            outbound: Mutex::new(VecDeque::with_capacity(OUTBOUND_CAPACITY)),
            files: Mutex::new(HashMap::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Display
    // -----------------------------------------------------------------------

    /// Run `f` with exclusive access to the display.
    pub fn with_display<R>(&self, f: impl FnOnce(&mut Display) -> R) -> R {
        let mut display = relock(self.display.lock());
        f(&mut display)
    }

    /// Direct lock, for callers that need to hold it across a copy.
    pub fn lock_display(&self) -> MutexGuard<'_, Display> {
        relock(self.display.lock())
    }

    // -----------------------------------------------------------------------
    // Stop flag
    // -----------------------------------------------------------------------

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Whole seconds since the host was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Record a key transition. Names are case-insensitive.
    pub fn set_key(&self, name: &str, pressed: bool) {
        let mut keys = relock(self.keys.write());
        let name = name.to_ascii_lowercase();
        if pressed {
            keys.insert(name);
        } else {
            keys.remove(&name);
        }
    }

    #[must_use]
    pub fn is_key_pressed(&self, name: &str) -> bool {
        relock(self.keys.read()).contains(&name.to_ascii_lowercase())
    }

    pub fn release_all_keys(&self) {
        relock(self.keys.write()).clear();
    }

    // -----------------------------------------------------------------------
    // Inbound queue
    // -----------------------------------------------------------------------

    /// Queue a packet for the script thread. Never blocks.
    pub fn push_inbound(&self, packet: Vec<u8>) -> Result<(), EmuError> {
        match self.inbound_tx.try_send(packet) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EmuError::InboundFull(INBOUND_CAPACITY)),
            // The receiver lives as long as `self`.
            Err(TrySendError::Disconnected(_)) => Ok(()),
        }
    }

    /// Lock the receiving end. Only the script thread and reset take this.
    pub(crate) fn inbound(&self) -> MutexGuard<'_, Receiver<Vec<u8>>> {
        relock(self.inbound_rx.lock())
    }

    /// Drop every queued packet.
    pub fn discard_inbound(&self) -> usize {
        let dropped = self.inbound().try_iter().count();
        if dropped > 0 {
            debug!("discarded {dropped} inbound packets");
        }
        dropped
    }

    // -----------------------------------------------------------------------
    // Outbound packets
    // -----------------------------------------------------------------------

    /// Queue a packet for the transport. When nobody drains the queue the
    /// oldest packet makes room.
    pub fn send(&self, packet: Vec<u8>) {
        let mut outbound = relock(self.outbound.lock());
        if outbound.len() >= OUTBOUND_CAPACITY {
            let dropped = outbound.pop_front().map_or(0, |p| p.len());
            warn!("outbound queue full, dropping oldest {dropped}-byte packet");
        }
        outbound.push_back(packet);
    }

    /// Take every packet the script has sent since the last call, oldest first.
    pub fn take_outbound(&self) -> Vec<Vec<u8>> {
        relock(self.outbound.lock()).drain(..).collect()
    }

    // -----------------------------------------------------------------------
    // Virtual file store
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        relock(self.files.lock()).get(path).cloned()
    }

    pub fn write_file(&self, path: &str, contents: Vec<u8>) {
        relock(self.files.lock()).insert(path.to_string(), contents);
    }

    pub fn remove_file(&self, path: &str) -> bool {
        relock(self.files.lock()).remove(path).is_some()
    }

    #[must_use]
    pub fn file_exists(&self, path: &str) -> bool {
        relock(self.files.lock()).contains_key(path)
    }
}
