//! Audio side: microphone capture → mono ring buffer → byte snapshots.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → downmix_to_mono → RingBuffer (latest fft_size)
//!           → SpectrumAnalyser → frequency / amplitude bytes → AudioSource
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use breath_coach::audio::{AudioSource, MicrophoneSource};
//! use breath_coach::config::AudioConfig;
//!
//! let mut mic = MicrophoneSource::new(AudioConfig::default());
//! mic.connect().unwrap();
//! let bytes = mic.amplitude_snapshot().unwrap();
//! println!("{} amplitude values", bytes.len());
//! ```

pub mod analyser;
pub mod buffer;
pub mod capture;
pub mod downmix;
pub mod source;
pub mod waveform;

pub use analyser::SpectrumAnalyser;
pub use buffer::RingBuffer;
pub use capture::MicrophoneSource;
pub use downmix::downmix_to_mono;
pub use source::{AudioSource, CaptureError, SnapshotError};
pub use waveform::WaveformData;

#[cfg(test)]
pub use source::ScriptedSource;
