//! Mutable state of one monitoring run, and the read-only copy handed to
//! renderers.

use std::time::Instant;

use super::evaluation::{BarLevels, Evaluation};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The complete state of one monitoring run.
///
/// Owned and mutated only by [`BreathMonitor`](super::BreathMonitor); reset
/// on every start, never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    /// Breath volume estimate, 0–100.
    pub strength: u8,
    /// Whole seconds since `start_time`.
    pub duration_secs: u64,
    /// Breaths per minute; zero until the first breath event.
    pub rhythm: u32,
    /// Composite score, 0–100.
    pub quality: u8,
    /// Breath events counted so far.
    pub breath_count: u32,
    pub start_time: Instant,
    /// Time of the latest breath event (`start_time` before the first one).
    pub last_breath_at: Instant,
    /// Whether polling should continue.
    pub active: bool,
}

impl Session {
    /// A fresh, active session starting at `now`.
    pub fn started_at(now: Instant) -> Self {
        Self {
            strength: 0,
            duration_secs: 0,
            rhythm: 0,
            quality: 0,
            breath_count: 0,
            start_time: now,
            last_breath_at: now,
            active: true,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            strength: self.strength,
            duration_secs: self.duration_secs,
            rhythm: self.rhythm,
            quality: self.quality,
            breath_count: self.breath_count,
            evaluation: Evaluation::from_metrics(
                self.strength,
                self.rhythm,
                self.duration_secs,
                self.quality,
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Metrics and labels emitted once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub strength: u8,
    pub duration_secs: u64,
    pub rhythm: u32,
    pub quality: u8,
    pub breath_count: u32,
    pub evaluation: Evaluation,
}

impl SessionSnapshot {
    pub fn bar_levels(&self) -> BarLevels {
        BarLevels::from_metrics(self.strength, self.rhythm, self.duration_secs, self.quality)
    }
}
