//! Breath monitor: session state, metric scoring, and the task runner.
//!
//! # Architecture
//!
//! ```text
//! MonitorCommand (mpsc) ─▶ MonitorRunner::run()  ← async tokio task
//!                              │
//!                              ├─ poll task  (100 ms) → BreathMonitor::tick()     → Session
//!                              └─ frame task (16 ms)  → BreathMonitor::waveform()
//!                                        │
//!                                        ▼
//!                                   RenderSink ──▶ SharedState ←── read by egui each frame
//! ```
//!
//! [`BreathMonitor`] is synchronous and does no scheduling; everything timed
//! lives in [`runner`].

pub mod breath;
pub mod clock;
pub mod evaluation;
pub mod quality;
pub mod runner;
pub mod session;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use breath::{BreathMonitor, MonitorError};
pub use clock::{Clock, SystemClock};
pub use evaluation::{
    BarLevels, DurationHint, Evaluation, QualityLabel, RhythmHint, Severity, StrengthHint,
};
pub use quality::score_quality;
pub use runner::{MonitorCommand, MonitorRunner, RenderSink, SharedMonitor};
pub use session::{Session, SessionSnapshot};
pub use state::{lock_state, new_shared_state, AppState, ErrorReport, MonitorPhase, SharedState};

#[cfg(test)]
pub use clock::ManualClock;
