//! Breath Coach: live breathing-exercise feedback from the microphone.
//!
//! ```text
//! MicrophoneSource (cpal) ──frequency bytes──▶ BreathMonitor::tick  (every 100 ms)
//!                         ──amplitude bytes──▶ frame task           (every frame)
//!                                                     │
//!                                                     ▼
//!                                      RenderSink (SharedState) ──▶ egui BreathApp
//! ```

pub mod app;
pub mod audio;
pub mod config;
pub mod hotkey;
pub mod monitor;
