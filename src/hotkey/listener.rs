//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` has no shutdown API.  Dropping [`HotkeyListener`] sets a
//! stop flag so the callback ignores further events; the thread itself stays
//! blocked in rdev until the process exits.

use std::io;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::HotkeyEvent;

/// Handle to a running hotkey listener thread.
pub struct HotkeyListener {
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn the listener thread.  Each press of `key` sends one
    /// [`HotkeyEvent::ToggleMonitoring`] on `tx`; holding the key down does
    /// not repeat it.
    pub fn start(key: rdev::Key, tx: mpsc::Sender<HotkeyEvent>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut gate = PressGate::new(key);
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if gate.feed(&event.event_type) {
                        // Not an async context; the UI drains the channel every frame.
                        if tx.blocking_send(HotkeyEvent::ToggleMonitoring).is_err() {
                            log::debug!("hotkey-listener: receiver gone");
                        }
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {e:?}");
                }
            })?;

        log::info!("hotkey: listening for {key:?}");
        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// PressGate
// ---------------------------------------------------------------------------

/// Turns the raw press/release stream of one key into single presses,
/// swallowing OS auto-repeat.
#[derive(Debug)]
struct PressGate {
    key: rdev::Key,
    held: bool,
}

impl PressGate {
    fn new(key: rdev::Key) -> Self {
        Self { key, held: false }
    }

    /// `true` when `event` is a fresh press of the watched key.
    fn feed(&mut self, event: &rdev::EventType) -> bool {
        match *event {
            rdev::EventType::KeyPress(k) if k == self.key => {
                !std::mem::replace(&mut self.held, true)
            }
            rdev::EventType::KeyRelease(k) if k == self.key => {
                self.held = false;
                false
            }
            _ => false,
        }
    }
}
