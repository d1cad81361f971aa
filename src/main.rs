//! Application entry point for Breath Coach.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load and validate [`AppConfig`] (defaults on first run or bad file).
//! 3. Create the tokio runtime.
//! 4. Create the command and hotkey channels and the shared UI state.
//! 5. Spawn the monitor runner on the runtime.
//! 6. Spawn the hotkey listener thread.
//! 7. Run [`eframe::run_native`], which blocks until the window is closed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui;
use tokio::sync::mpsc;

use breath_coach::{
    app::BreathApp,
    audio::MicrophoneSource,
    config::AppConfig,
    hotkey::{parse_key, HotkeyEvent, HotkeyListener},
    monitor::{new_shared_state, BreathMonitor, MonitorCommand, MonitorRunner, RenderSink},
};

const DEFAULT_TOGGLE_KEY: rdev::Key = rdev::Key::F9;
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn load_config() -> AppConfig {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to load config ({e:#}); using defaults");
            return AppConfig::default();
        }
    };
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            log::warn!("Invalid config ({e}); using defaults");
            AppConfig::default()
        }
    }
}

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_title("Breath Coach")
        .with_inner_size([520.0, 560.0])
        .with_min_inner_size([420.0, 420.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Breath Coach starting up");

    // 2. Configuration
    let config = load_config();

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 4. Channels and shared state
    let (command_tx, command_rx) = mpsc::channel::<MonitorCommand>(16);
    let (hotkey_tx, hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let state = new_shared_state();

    // 5. Monitor runner
    match MicrophoneSource::input_device_names() {
        Ok(names) => log::info!("Input devices: {}", names.join(", ")),
        Err(e) => log::warn!("Could not list input devices: {e}"),
    }
    let source = MicrophoneSource::new(config.audio.clone());
    let monitor = BreathMonitor::new(source, config.monitor.clone());
    let sink: Arc<dyn RenderSink> = state.clone();
    let runner = MonitorRunner::new(monitor, sink, config.monitor.clone());
    let runner_task = rt.spawn(runner.run(command_rx));

    // 6. Hotkey listener thread
    let key = parse_key(&config.hotkey.toggle_key).unwrap_or_else(|| {
        log::warn!(
            "Unknown toggle key {:?}; falling back to {DEFAULT_TOGGLE_KEY:?}",
            config.hotkey.toggle_key
        );
        DEFAULT_TOGGLE_KEY
    });
    let _hotkey_listener = match HotkeyListener::start(key, hotkey_tx) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("Global hotkey unavailable: {e}");
            None
        }
    };

    // 7. Build the egui app and run it (blocks until the window is closed)
    let app = BreathApp::new(state, command_tx, hotkey_rx, config.clone());
    let options = native_options(&config);

    eframe::run_native(
        "Breath Coach",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("window closed with an error: {e}"))?;

    // The app held the last command sender, so the runner is now winding
    // down and releasing the microphone.
    let finished =
        rt.block_on(async { tokio::time::timeout(SHUTDOWN_GRACE, runner_task).await });
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Monitor runner panicked: {e}"),
        Err(_) => log::warn!("Monitor runner did not stop within {SHUTDOWN_GRACE:?}"),
    }
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    log::info!("Breath Coach stopped");
    Ok(())
}
