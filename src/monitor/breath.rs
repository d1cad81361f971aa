//! The breath monitor: session lifecycle and the per-tick metric update.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::clock::{Clock, SystemClock};
use super::quality::{mean, score_quality, strength_from_average};
use super::session::{Session, SessionSnapshot};
use crate::audio::{AudioSource, CaptureError, SnapshotError};
use crate::config::MonitorConfig;

// ---------------------------------------------------------------------------
// MonitorError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// A snapshot failed mid-session; the session has been stopped.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The blocking task running the monitor panicked.
    #[error("monitor task failed: {0}")]
    Task(String),
}

impl MonitorError {
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            MonitorError::Capture(e) => e.remediation(),
            MonitorError::Snapshot(_) | MonitorError::Task(_) => {
                Some("Press Start to begin a new session.")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// BreathMonitor
// ---------------------------------------------------------------------------

/// Turns frequency snapshots into a running [`Session`].
///
/// The monitor does no scheduling of its own.  Whoever owns it calls
/// [`tick`](Self::tick) on the poll cadence and
/// [`waveform`](Self::waveform) on the frame cadence.
///
/// # Example
///
/// ```rust,no_run
/// use breath_coach::audio::MicrophoneSource;
/// use breath_coach::config::AppConfig;
/// use breath_coach::monitor::BreathMonitor;
///
/// let cfg = AppConfig::default();
/// let mut monitor = BreathMonitor::new(MicrophoneSource::new(cfg.audio), cfg.monitor);
/// monitor.start().unwrap();
/// if let Some(snapshot) = monitor.tick().unwrap() {
///     println!("strength {}%", snapshot.strength);
/// }
/// monitor.stop();
/// ```
pub struct BreathMonitor<S: AudioSource> {
    source: S,
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    /// `None` until the first successful start; kept after stop so the last
    /// figures stay readable.
    session: Option<Session>,
}

impl<S: AudioSource> BreathMonitor<S> {
    pub fn new(source: S, config: MonitorConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            config,
            clock,
            session: None,
        }
    }

    /// Connect the audio source and begin a fresh session.
    ///
    /// A no-op while a session is already active.  On failure no session is
    /// created and the previous (stopped) one is left untouched.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_active() {
            return Ok(());
        }

        if let Err(e) = self.source.connect() {
            log::error!("monitor: failed to acquire microphone: {e}");
            return Err(e);
        }

        self.session = Some(Session::started_at(self.clock.now()));
        log::info!("monitor: session started");
        Ok(())
    }

    /// End the active session and release the audio source.  Idempotent.
    pub fn stop(&mut self) {
        let Some(session) = self.session.as_mut().filter(|s| s.active) else {
            return;
        };
        session.active = false;
        self.source.disconnect();
        log::info!(
            "monitor: session stopped after {}s, {} breaths",
            session.duration_secs,
            session.breath_count
        );
    }

    /// Run one poll step.
    ///
    /// Returns `Ok(None)` when no session is active.  A snapshot failure
    /// stops the session before the error is returned.
    pub fn tick(&mut self) -> Result<Option<SessionSnapshot>, MonitorError> {
        if !self.is_active() {
            return Ok(None);
        }

        let frame = match self.source.frequency_snapshot() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("monitor: frequency snapshot failed: {e}");
                self.stop();
                return Err(e.into());
            }
        };

        let now = self.clock.now();
        let average = mean(&frame);
        let threshold = self.config.breath_threshold;
        let refractory =
            Duration::try_from_secs_f64(self.config.refractory_secs).unwrap_or(Duration::MAX);

        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        session.strength = strength_from_average(average);

        if average > threshold && now.duration_since(session.last_breath_at) >= refractory {
            session.breath_count += 1;
            session.last_breath_at = now;

            let elapsed_minutes = now.duration_since(session.start_time).as_secs_f64() / 60.0;
            if elapsed_minutes > 0.0 {
                session.rhythm = (f64::from(session.breath_count) / elapsed_minutes).round() as u32;
            }
            log::debug!(
                "monitor: breath #{} (avg {average:.1}, {} RPM)",
                session.breath_count,
                session.rhythm
            );
        }

        session.duration_secs = now.duration_since(session.start_time).as_secs();
        session.quality = score_quality(session.strength, session.rhythm, session.duration_secs);

        Ok(Some(session.snapshot()))
    }

    /// Current amplitude snapshot for the waveform, `None` when idle.
    pub fn waveform(&mut self) -> Result<Option<Vec<u8>>, SnapshotError> {
        if !self.is_active() {
            return Ok(None);
        }
        self.source.amplitude_snapshot().map(Some)
    }

    /// The current or most recent session.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ScriptedSource;
    use crate::monitor::clock::ManualClock;
    use crate::monitor::evaluation::QualityLabel;

    fn monitor_with(source: ScriptedSource) -> (BreathMonitor<ScriptedSource>, ManualClock) {
        let clock = ManualClock::new();
        let monitor =
            BreathMonitor::with_clock(source, MonitorConfig::default(), Arc::new(clock.clone()));
        (monitor, clock)
    }

    fn tick_every(
        monitor: &mut BreathMonitor<ScriptedSource>,
        clock: &ManualClock,
        step: Duration,
        ticks: usize,
    ) -> Vec<SessionSnapshot> {
        (0..ticks)
            .map(|_| {
                clock.advance(step);
                monitor.tick().unwrap().unwrap()
            })
            .collect()
    }

    // ---- lifecycle ----------------------------------------------------------

    #[test]
    fn failures_after_start_advise_a_restart() {
        let task = MonitorError::Task("poll task panicked".into());
        assert!(task.to_string().contains("poll task panicked"));
        assert_eq!(task.remediation(), Some("Press Start to begin a new session."));
        assert_eq!(
            MonitorError::Capture(CaptureError::Unknown("x".into())).remediation(),
            None
        );
    }

    #[test]
    fn start_resets_session() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(100));
        monitor.start().unwrap();
        tick_every(&mut monitor, &clock, Duration::from_secs(2), 3);
        assert_eq!(monitor.session().unwrap().breath_count, 3);

        monitor.stop();
        monitor.start().unwrap();
        let s = monitor.session().unwrap();
        assert!(s.active);
        assert_eq!(s.breath_count, 0);
        assert_eq!(s.rhythm, 0);
        assert_eq!(s.start_time, clock.now());
        assert_eq!(monitor.source().connect_calls, 2);
    }

    #[test]
    fn start_while_active_is_noop() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(100));
        monitor.start().unwrap();
        tick_every(&mut monitor, &clock, Duration::from_secs(2), 1);

        monitor.start().unwrap();
        assert_eq!(monitor.session().unwrap().breath_count, 1);
        assert_eq!(monitor.source().connect_calls, 1);
    }

    #[test]
    fn connect_failure_creates_no_session() {
        let (mut monitor, _clock) =
            monitor_with(ScriptedSource::failing_connect(CaptureError::PermissionDenied));

        assert_eq!(monitor.start(), Err(CaptureError::PermissionDenied));
        assert!(!monitor.is_active());
        assert!(monitor.session().is_none());
        assert_eq!(monitor.tick(), Ok(None));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut monitor, _clock) = monitor_with(ScriptedSource::with_average(0));
        monitor.stop();
        assert_eq!(monitor.source().disconnect_calls, 0);

        monitor.start().unwrap();
        monitor.stop();
        monitor.stop();
        assert!(!monitor.is_active());
        assert!(!monitor.source().is_connected());
        assert_eq!(monitor.source().disconnect_calls, 1);
    }

    #[test]
    fn tick_after_stop_leaves_session_unchanged() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(100));
        monitor.start().unwrap();
        tick_every(&mut monitor, &clock, Duration::from_secs(2), 2);
        monitor.stop();
        let before = monitor.session().unwrap().snapshot();

        clock.advance(Duration::from_secs(5));
        assert_eq!(monitor.tick(), Ok(None));
        assert_eq!(monitor.session().unwrap().snapshot(), before);
    }

    #[test]
    fn snapshot_failure_stops_session() {
        let source = ScriptedSource::with_average(100)
            .push(Ok(vec![100; 16]))
            .push(Err(SnapshotError::Stream("device unplugged".into())));
        let (mut monitor, clock) = monitor_with(source);
        monitor.start().unwrap();
        tick_every(&mut monitor, &clock, Duration::from_secs(2), 1);

        clock.advance(Duration::from_millis(100));
        let err = monitor.tick().unwrap_err();
        assert_eq!(
            err,
            MonitorError::Snapshot(SnapshotError::Stream("device unplugged".into()))
        );
        assert!(!monitor.is_active());
        assert!(!monitor.source().is_connected());
        assert_eq!(monitor.session().unwrap().breath_count, 1);
        assert_eq!(monitor.tick(), Ok(None));
    }

    #[test]
    fn waveform_only_while_active() {
        let (mut monitor, _clock) = monitor_with(ScriptedSource::with_average(0));
        assert_eq!(monitor.waveform(), Ok(None));

        monitor.start().unwrap();
        assert_eq!(monitor.waveform(), Ok(Some(vec![128; 16])));

        monitor.stop();
        assert_eq!(monitor.waveform(), Ok(None));
    }

    // ---- breath detection ----------------------------------------------------

    #[test]
    fn quiet_input_never_counts() {
        for average in [0, 10, 30] {
            let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(average));
            monitor.start().unwrap();
            let snaps = tick_every(&mut monitor, &clock, Duration::from_secs(3), 20);
            assert!(snaps.iter().all(|s| s.breath_count == 0), "avg {average}");
            assert!(snaps.iter().all(|s| s.rhythm == 0));
        }
    }

    #[test]
    fn events_closer_than_refractory_count_once() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(31));
        monitor.start().unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(monitor.tick().unwrap().unwrap().breath_count, 1);

        clock.advance(Duration::from_millis(999));
        assert_eq!(monitor.tick().unwrap().unwrap().breath_count, 1);
    }

    #[test]
    fn events_at_refractory_count_twice() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(31));
        monitor.start().unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(monitor.tick().unwrap().unwrap().breath_count, 1);

        clock.advance(Duration::from_secs(1));
        assert_eq!(monitor.tick().unwrap().unwrap().breath_count, 2);
    }

    #[test]
    fn half_second_ticks_for_five_seconds() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(100));
        monitor.start().unwrap();
        let snaps = tick_every(&mut monitor, &clock, Duration::from_millis(500), 10);

        assert_eq!(snaps.last().unwrap().breath_count, 5);
        for pair in snaps.windows(2) {
            let grew = pair[1].breath_count - pair[0].breath_count;
            assert!(grew <= 1);
        }
    }

    #[test]
    fn count_is_monotonic_over_mixed_input() {
        let mut source = ScriptedSource::with_average(0);
        for i in 0..60u8 {
            let level = if i % 3 == 0 { 90 } else { i % 40 };
            source = source.push(Ok(vec![level; 16]));
        }
        let (mut monitor, clock) = monitor_with(source);
        monitor.start().unwrap();
        let snaps = tick_every(&mut monitor, &clock, Duration::from_millis(350), 60);

        for pair in snaps.windows(2) {
            assert!(pair[1].breath_count >= pair[0].breath_count);
            assert!(pair[1].breath_count - pair[0].breath_count <= 1);
        }
        for s in &snaps {
            assert!(s.strength <= 100);
            assert!(s.quality <= 100);
        }
    }

    #[test]
    fn rhythm_unchanged_when_no_time_has_elapsed() {
        let config = MonitorConfig {
            refractory_secs: 0.0,
            ..MonitorConfig::default()
        };
        let clock = ManualClock::new();
        let mut monitor = BreathMonitor::with_clock(
            ScriptedSource::with_average(100),
            config,
            Arc::new(clock.clone()),
        );
        monitor.start().unwrap();

        let snap = monitor.tick().unwrap().unwrap();
        assert_eq!(snap.breath_count, 1);
        assert_eq!(snap.rhythm, 0);
    }

    #[test]
    fn rhythm_is_breaths_per_elapsed_minute() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(100));
        monitor.start().unwrap();
        let snaps = tick_every(&mut monitor, &clock, Duration::from_secs(4), 5);
        assert!(snaps.iter().all(|s| s.rhythm == 15));
        assert_eq!(snaps.last().unwrap().duration_secs, 20);
    }

    #[test]
    fn duration_is_floored_seconds() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(0));
        monitor.start().unwrap();
        clock.advance(Duration::from_millis(2_999));
        assert_eq!(monitor.tick().unwrap().unwrap().duration_secs, 2);
    }

    // ---- scenarios -----------------------------------------------------------

    #[test]
    fn steady_session_scores_excellent() {
        let (mut monitor, clock) = monitor_with(ScriptedSource::with_average(60));
        monitor.start().unwrap();
        tick_every(&mut monitor, &clock, Duration::from_secs(4), 8);

        clock.advance(Duration::from_secs(3));
        let snap = monitor.tick().unwrap().unwrap();
        assert_eq!(snap.strength, 47);
        assert_eq!(snap.duration_secs, 35);
        assert_eq!(snap.rhythm, 15);
        assert_eq!(snap.quality, 100);
        assert_eq!(snap.evaluation.quality, QualityLabel::Excellent);
    }

    #[test]
    fn quiet_early_session_needs_improvement() {
        let (mut monitor, clock) =
            monitor_with(ScriptedSource::constant(vec![25, 26, 26, 25, 26]));
        monitor.start().unwrap();
        let snap = tick_every(&mut monitor, &clock, Duration::from_millis(100), 100)
            .pop()
            .unwrap();

        assert_eq!(snap.strength, 20);
        assert_eq!(snap.rhythm, 0);
        assert_eq!(snap.duration_secs, 10);
        assert_eq!(snap.quality, 10);
        assert_eq!(snap.evaluation.quality, QualityLabel::NeedsImprovement);
    }
}
