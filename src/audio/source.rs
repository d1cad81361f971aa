//! The audio-source capability consumed by the breath monitor.
//!
//! An [`AudioSource`] hands out fixed-length byte snapshots in the shape a
//! browser analyser node produces:
//!
//! * **frequency**: one magnitude per bin, `0` = at or below the noise floor,
//!   `255` = at or above the loudness ceiling;
//! * **amplitude**: time-domain samples where `128` is silence.
//!
//! Acquisition failures are classified into [`CaptureError`] at
//! [`connect`](AudioSource::connect); failures once connected surface as
//! [`SnapshotError`].

use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Why the microphone could not be acquired.
///
/// Never retried automatically; the caller decides whether to try again after
/// the user has fixed the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The host exposes no microphone at all.
    #[error("no microphone is available on this system")]
    Unavailable,

    /// The user or the OS refused access to the microphone.
    #[error("microphone access was denied")]
    PermissionDenied,

    /// The device exists but is held by another consumer.
    #[error("the microphone is in use by another application")]
    DeviceBusy,

    /// Any other acquisition failure.
    #[error("failed to open the microphone: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Advice shown next to the error message, if there is any to give.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            CaptureError::Unavailable => {
                Some("No microphone was found. Connect one and press Start again.")
            }
            CaptureError::PermissionDenied => Some(
                "Allow microphone access for this application in the system \
                 privacy settings, then press Start again.",
            ),
            CaptureError::DeviceBusy => Some(
                "Close other applications that may be using the microphone, \
                 then press Start again.",
            ),
            CaptureError::Unknown(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotError
// ---------------------------------------------------------------------------

/// A snapshot could not be produced by a connected (or formerly connected)
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("audio source is not connected")]
    Disconnected,

    #[error("audio stream failed: {0}")]
    Stream(String),
}

// ---------------------------------------------------------------------------
// AudioSource
// ---------------------------------------------------------------------------

/// Snapshot provider behind the breath monitor.
///
/// Implementations must be `Send` so the monitor can be ticked from a tokio
/// task.
pub trait AudioSource: Send {
    /// Acquire the microphone.  Calling it on a connected source is a no-op.
    fn connect(&mut self) -> Result<(), CaptureError>;

    /// Release the microphone.  Idempotent.
    fn disconnect(&mut self);

    /// Current frequency-magnitude snapshot.
    fn frequency_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError>;

    /// Current time-domain amplitude snapshot.
    fn amplitude_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError>;
}

// ---------------------------------------------------------------------------
// ScriptedSource  (test-only)
// ---------------------------------------------------------------------------

/// Source that replays a queue of frequency snapshots.
///
/// Once the queue is empty the `idle` snapshot is returned forever.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: std::collections::VecDeque<Result<Vec<u8>, SnapshotError>>,
    idle: Vec<u8>,
    connect_error: Option<CaptureError>,
    connected: bool,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    /// Thread of every call, in order.
    pub call_threads: Vec<std::thread::ThreadId>,
}

#[cfg(test)]
impl ScriptedSource {
    /// A source that returns `frame` on every call.
    pub fn constant(frame: Vec<u8>) -> Self {
        Self {
            idle: frame,
            ..Default::default()
        }
    }

    /// A source whose every snapshot averages to `average`.
    pub fn with_average(average: u8) -> Self {
        Self::constant(vec![average; 16])
    }

    /// A source whose `connect` always fails with `err`.
    pub fn failing_connect(err: CaptureError) -> Self {
        Self {
            connect_error: Some(err),
            ..Default::default()
        }
    }

    /// Queue one frame to be returned before the idle frame.
    pub fn push(mut self, frame: Result<Vec<u8>, SnapshotError>) -> Self {
        self.frames.push_back(frame);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn record_thread(&mut self) {
        self.call_threads.push(std::thread::current().id());
    }
}

#[cfg(test)]
impl AudioSource for ScriptedSource {
    fn connect(&mut self) -> Result<(), CaptureError> {
        self.record_thread();
        self.connect_calls += 1;
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.record_thread();
        self.disconnect_calls += 1;
        self.connected = false;
    }

    fn frequency_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError> {
        self.record_thread();
        if !self.connected {
            return Err(SnapshotError::Disconnected);
        }
        self.frames
            .pop_front()
            .unwrap_or_else(|| Ok(self.idle.clone()))
    }

    fn amplitude_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError> {
        self.record_thread();
        if !self.connected {
            return Err(SnapshotError::Disconnected);
        }
        Ok(vec![128; 16])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
