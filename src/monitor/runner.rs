//! Monitor runner: schedules the poll and frame tasks around a
//! [`BreathMonitor`].
//!
//! # Flow
//!
//! ```text
//! MonitorCommand::Start
//!   └─▶ monitor.start()
//!         ├─ Err → sink.monitoring_failed            (nothing scheduled)
//!         └─ Ok  → sink.monitoring_started
//!                  ├─ poll task  (tick_interval_ms)  → monitor.tick()     → sink.session_updated
//!                  └─ frame task (frame_interval_ms) → monitor.waveform() → sink.waveform_updated
//!
//! MonitorCommand::Stop
//!   └─▶ clear active flag, monitor.stop(), await both tasks, sink.monitoring_stopped
//! ```
//!
//! Both tasks check the shared `active` flag at the top of every period, so
//! an in-flight tick is never interrupted.
//!
//! Every call into the monitor, device open included, runs on the blocking
//! pool through `tokio::task::spawn_blocking` so the async runtime never
//! stalls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;

use super::breath::{BreathMonitor, MonitorError};
use super::session::SessionSnapshot;
use crate::audio::AudioSource;
use crate::config::MonitorConfig;

// ---------------------------------------------------------------------------
// RenderSink
// ---------------------------------------------------------------------------

/// Receiver of everything the monitor produces.
///
/// Called from tokio tasks; implementations must not block for long.
pub trait RenderSink: Send + Sync {
    fn monitoring_started(&self);

    /// Once per poll period.
    fn session_updated(&self, snapshot: &SessionSnapshot);

    /// Once per display frame.
    fn waveform_updated(&self, amplitude: &[u8]);

    fn monitoring_stopped(&self);

    fn monitoring_failed(&self, error: &MonitorError);
}

// ---------------------------------------------------------------------------
// MonitorCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    Start,
    Stop,
}

/// A monitor shared between the runner and its tasks.
pub type SharedMonitor<S> = Arc<Mutex<BreathMonitor<S>>>;

fn lock<S: AudioSource>(monitor: &Mutex<BreathMonitor<S>>) -> MutexGuard<'_, BreathMonitor<S>> {
    monitor.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `f` on the locked monitor from the blocking pool.
async fn with_monitor<S, T, F>(monitor: &SharedMonitor<S>, f: F) -> Result<T, JoinError>
where
    S: AudioSource + 'static,
    T: Send + 'static,
    F: FnOnce(&mut BreathMonitor<S>) -> T + Send + 'static,
{
    let monitor = Arc::clone(monitor);
    tokio::task::spawn_blocking(move || f(&mut lock(&monitor))).await
}

// ---------------------------------------------------------------------------
// MonitorRunner
// ---------------------------------------------------------------------------

/// Owns the monitor and drives it from [`MonitorCommand`]s.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use breath_coach::audio::MicrophoneSource;
/// use breath_coach::config::AppConfig;
/// use breath_coach::monitor::{new_shared_state, BreathMonitor, MonitorCommand, MonitorRunner};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let state = new_shared_state();
/// let source = MicrophoneSource::new(config.audio.clone());
/// let monitor = BreathMonitor::new(source, config.monitor.clone());
///
/// let (tx, rx) = tokio::sync::mpsc::channel(8);
/// let runner = MonitorRunner::new(monitor, state, config.monitor);
/// tokio::spawn(runner.run(rx));
/// tx.send(MonitorCommand::Start).await.unwrap();
/// # }
/// ```
pub struct MonitorRunner<S: AudioSource + 'static> {
    monitor: SharedMonitor<S>,
    sink: Arc<dyn RenderSink>,
    tick_interval: Duration,
    frame_interval: Duration,
    active: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: AudioSource + 'static> MonitorRunner<S> {
    pub fn new(
        monitor: BreathMonitor<S>,
        sink: Arc<dyn RenderSink>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
            sink,
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            frame_interval: Duration::from_millis(config.frame_interval_ms.max(1)),
            active: Arc::new(AtomicBool::new(false)),
            tasks: Vec::new(),
        }
    }

    pub fn monitor(&self) -> SharedMonitor<S> {
        Arc::clone(&self.monitor)
    }

    /// Run until `commands` is closed, then stop any active session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<MonitorCommand>) {
        while let Some(cmd) = commands.recv().await {
            log::debug!("runner: {cmd:?}");
            match cmd {
                MonitorCommand::Start => self.handle_start().await,
                MonitorCommand::Stop => self.handle_stop().await,
            }
        }

        log::info!("runner: command channel closed, shutting down");
        self.handle_stop().await;
    }

    async fn handle_start(&mut self) {
        if self.active.load(Ordering::Acquire) {
            log::debug!("runner: already monitoring");
            return;
        }
        // Tasks of a session that ended on its own have already returned.
        self.join_tasks().await;

        let failure = match with_monitor(&self.monitor, |m| m.start()).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(MonitorError::Capture(e)),
            Err(e) => Some(MonitorError::Task(e.to_string())),
        };
        if let Some(e) = failure {
            self.sink.monitoring_failed(&e);
            return;
        }

        self.active.store(true, Ordering::Release);
        self.sink.monitoring_started();

        self.tasks.push(tokio::spawn(poll_loop(
            Arc::clone(&self.monitor),
            Arc::clone(&self.sink),
            Arc::clone(&self.active),
            self.tick_interval,
        )));
        self.tasks.push(tokio::spawn(frame_loop(
            Arc::clone(&self.monitor),
            Arc::clone(&self.sink),
            Arc::clone(&self.active),
            self.frame_interval,
        )));
    }

    async fn handle_stop(&mut self) {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if let Err(e) = with_monitor(&self.monitor, |m| m.stop()).await {
            log::error!("runner: stopping the monitor panicked: {e}");
        }
        self.join_tasks().await;

        if was_active {
            self.sink.monitoring_stopped();
        }
    }

    async fn join_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                log::warn!("runner: monitor task panicked: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn period(every: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn poll_loop<S: AudioSource + 'static>(
    monitor: SharedMonitor<S>,
    sink: Arc<dyn RenderSink>,
    active: Arc<AtomicBool>,
    every: Duration,
) {
    // The first tick completes immediately, so analysis starts with the
    // session.
    let mut interval = period(every);

    loop {
        interval.tick().await;
        if !active.load(Ordering::Acquire) {
            break;
        }

        let result = with_monitor(&monitor, |m| m.tick())
            .await
            .unwrap_or_else(|e| Err(MonitorError::Task(e.to_string())));
        match result {
            Ok(Some(snapshot)) => sink.session_updated(&snapshot),
            Ok(None) => break,
            Err(e) => {
                active.store(false, Ordering::Release);
                sink.monitoring_failed(&e);
                break;
            }
        }
    }
    log::debug!("runner: poll task finished");
}

async fn frame_loop<S: AudioSource + 'static>(
    monitor: SharedMonitor<S>,
    sink: Arc<dyn RenderSink>,
    active: Arc<AtomicBool>,
    every: Duration,
) {
    let mut interval = period(every);

    loop {
        interval.tick().await;
        if !active.load(Ordering::Acquire) {
            break;
        }

        let result = match with_monitor(&monitor, |m| m.waveform()).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("runner: waveform task panicked: {e}");
                break;
            }
        };
        match result {
            Ok(Some(amplitude)) => sink.waveform_updated(&amplitude),
            Ok(None) => break,
            Err(e) => {
                // The poll task reports the session failure.
                log::warn!("runner: waveform snapshot failed: {e}");
                break;
            }
        }
    }
    log::debug!("runner: frame task finished");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
