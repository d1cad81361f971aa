//! Monitor phase and shared application state.
//!
//! [`AppState`] is the single source of truth for everything the UI needs:
//! current phase, the latest session snapshot, waveform bytes, config, and the
//! last error.  The runner writes it through the [`RenderSink`] impl; the egui
//! update loop reads it each frame.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<AppState>>`, cheap to clone
//! and safe to share across threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::breath::MonitorError;
use super::runner::RenderSink;
use super::session::SessionSnapshot;

// ---------------------------------------------------------------------------
// MonitorPhase
// ---------------------------------------------------------------------------

/// What the monitor is doing, as far as the UI is concerned.
///
/// ```text
/// Idle ──start ok──▶ Monitoring ──stop──▶ Idle
///      ──start err─▶ Failed
///                    Monitoring ──snapshot err──▶ Failed
/// Failed ──start ok──▶ Monitoring
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonitorPhase {
    #[default]
    Idle,
    Monitoring,
    Failed,
}

impl MonitorPhase {
    /// ```
    /// use breath_coach::monitor::MonitorPhase;
    ///
    /// assert!(MonitorPhase::Monitoring.is_active());
    /// assert!(!MonitorPhase::Idle.is_active());
    /// assert!(!MonitorPhase::Failed.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, MonitorPhase::Monitoring)
    }

    /// Short status-bar text.
    pub fn label(&self) -> &'static str {
        match self {
            MonitorPhase::Idle => "Ready",
            MonitorPhase::Monitoring => "Monitoring",
            MonitorPhase::Failed => "Stopped with an error",
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorReport
// ---------------------------------------------------------------------------

/// An error as the UI shows it: the message and what the user can do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub remediation: Option<String>,
}

impl From<&MonitorError> for ErrorReport {
    fn from(err: &MonitorError) -> Self {
        Self {
            message: err.to_string(),
            remediation: err.remediation().map(str::to_owned),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Held behind [`SharedState`].  The runner mutates it; the UI reads it.
#[derive(Default)]
pub struct AppState {
    pub phase: MonitorPhase,

    /// Latest tick result.  Kept after stop so the final figures stay on
    /// screen; cleared when a new session starts.
    pub snapshot: Option<SessionSnapshot>,

    /// Latest amplitude bytes; empty whenever no session is running.
    pub waveform: Vec<u8>,

    /// Set on failure, cleared on the next successful start.
    pub error: Option<ErrorReport>,
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`AppState`].
///
/// Lock with [`lock_state`] for a short critical section; do **not** hold the
/// lock across `.await` points.
pub type SharedState = Arc<Mutex<AppState>>;

pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(AppState::default()))
}

/// Lock the state, recovering it if a previous holder panicked.
pub fn lock_state(state: &Mutex<AppState>) -> MutexGuard<'_, AppState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RenderSink for Mutex<AppState> {
    fn monitoring_started(&self) {
        let mut st = lock_state(self);
        st.phase = MonitorPhase::Monitoring;
        st.snapshot = None;
        st.waveform.clear();
        st.error = None;
    }

    fn session_updated(&self, snapshot: &SessionSnapshot) {
        lock_state(self).snapshot = Some(*snapshot);
    }

    fn waveform_updated(&self, amplitude: &[u8]) {
        let mut st = lock_state(self);
        st.waveform.clear();
        st.waveform.extend_from_slice(amplitude);
    }

    fn monitoring_stopped(&self) {
        let mut st = lock_state(self);
        if st.phase == MonitorPhase::Monitoring {
            st.phase = MonitorPhase::Idle;
        }
        st.waveform.clear();
    }

    fn monitoring_failed(&self, error: &MonitorError) {
        let mut st = lock_state(self);
        st.phase = MonitorPhase::Failed;
        st.waveform.clear();
        st.error = Some(ErrorReport::from(error));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
