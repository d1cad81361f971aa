//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A setting that parsed fine but cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("fft_size must be a power of two in [32, 32768], got {0}")]
    FftSize(usize),

    #[error("{name} must be greater than zero")]
    ZeroInterval { name: &'static str },

    #[error("min_decibels ({min}) must be below max_decibels ({max})")]
    DecibelRange { min: f32, max: f32 },

    #[error("smoothing must be in [0.0, 1.0), got {0}")]
    Smoothing(f32),

    #[error("refractory_secs must be a finite non-negative number, got {0}")]
    Refractory(f64),
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Breath detection cadence and thresholds.
///
/// The defaults are the empirically chosen values of the breathing tool and
/// should only be changed for experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Period of the poll task that calls `BreathMonitor::tick`.
    pub tick_interval_ms: u64,
    /// Period of the frame task that refreshes the waveform.
    pub frame_interval_ms: u64,
    /// Mean frequency magnitude (0–255) above which a tick counts as breath.
    pub breath_threshold: f64,
    /// Minimum spacing between two counted breath events.
    pub refractory_secs: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            frame_interval_ms: 16,
            breath_threshold: 30.0,
            refractory_secs: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Microphone selection and analyser parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Analysis window in samples; snapshots hold `fft_size / 2` values.
    pub fft_size: usize,
    /// Exponential smoothing applied to successive spectra (0.0 – <1.0).
    pub smoothing: f32,
    /// Magnitude in dB mapped to byte value 0.
    pub min_decibels: f32,
    /// Magnitude in dB mapped to byte value 255.
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            fft_size: 2048,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Key that toggles monitoring on and off (e.g. `"F9"`).
    pub toggle_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_key: "F9".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` lets the
    /// window manager decide.
    pub window_position: Option<(f32, f32)>,
    /// Keep the window floating above all other windows.
    pub always_on_top: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// Missing sections fall back to their defaults, so a file containing only
/// `[hotkey]` is valid.
///
/// ```rust,no_run
/// use breath_coach::config::AppConfig;
///
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub audio: AudioConfig,
    pub hotkey: HotkeyConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the analyser or the scheduler misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fft = self.audio.fft_size;
        if !fft.is_power_of_two() || !(32..=32_768).contains(&fft) {
            return Err(ConfigError::FftSize(fft));
        }
        if self.monitor.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                name: "tick_interval_ms",
            });
        }
        if self.monitor.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                name: "frame_interval_ms",
            });
        }
        if self.audio.min_decibels >= self.audio.max_decibels {
            return Err(ConfigError::DecibelRange {
                min: self.audio.min_decibels,
                max: self.audio.max_decibels,
            });
        }
        if !(0.0..1.0).contains(&self.audio.smoothing) {
            return Err(ConfigError::Smoothing(self.audio.smoothing));
        }
        let refractory = self.monitor.refractory_secs;
        if !refractory.is_finite() || refractory < 0.0 {
            return Err(ConfigError::Refractory(refractory));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(
            original.monitor.tick_interval_ms,
            loaded.monitor.tick_interval_ms
        );
        assert_eq!(
            original.monitor.breath_threshold,
            loaded.monitor.breath_threshold
        );
        assert_eq!(original.audio.fft_size, loaded.audio.fft_size);
        assert_eq!(original.audio.input_device, loaded.audio.input_device);
        assert_eq!(original.hotkey.toggle_key, loaded.hotkey.toggle_key);
        assert_eq!(original.ui.always_on_top, loaded.ui.always_on_top);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.monitor.tick_interval_ms, 100);
        assert_eq!(config.hotkey.toggle_key, "F9");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.monitor.tick_interval_ms, 100);
        assert_eq!(cfg.monitor.breath_threshold, 30.0);
        assert_eq!(cfg.monitor.refractory_secs, 1.0);
        assert_eq!(cfg.audio.fft_size, 2048);
        assert_eq!(cfg.audio.min_decibels, -100.0);
        assert_eq!(cfg.audio.max_decibels, -30.0);
        assert!(cfg.audio.input_device.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[hotkey]\ntoggle_key = \"F10\"\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.hotkey.toggle_key, "F10");
        assert_eq!(cfg.audio.fft_size, 2048);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.audio.input_device = Some("USB Mic".into());
        cfg.audio.fft_size = 1024;
        cfg.monitor.frame_interval_ms = 33;
        cfg.ui.window_position = Some((100.0, 200.0));

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.audio.input_device.as_deref(), Some("USB Mic"));
        assert_eq!(loaded.audio.fft_size, 1024);
        assert_eq!(loaded.monitor.frame_interval_ms, 33);
        assert_eq!(loaded.ui.window_position, Some((100.0, 200.0)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[audio\nfft_size = ").expect("write");
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn validate_rejects_bad_fft_size() {
        let mut cfg = AppConfig::default();
        cfg.audio.fft_size = 1000;
        assert_eq!(cfg.validate(), Err(ConfigError::FftSize(1000)));

        cfg.audio.fft_size = 16;
        assert_eq!(cfg.validate(), Err(ConfigError::FftSize(16)));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut cfg = AppConfig::default();
        cfg.monitor.tick_interval_ms = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroInterval { name: "tick_interval_ms" })
        ));
    }

    #[test]
    fn validate_rejects_inverted_decibels_and_smoothing() {
        let mut cfg = AppConfig::default();
        cfg.audio.min_decibels = -20.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DecibelRange { .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.audio.smoothing = 1.0;
        assert_eq!(cfg.validate(), Err(ConfigError::Smoothing(1.0)));
    }

    #[test]
    fn validate_rejects_unusable_refractory() {
        let mut cfg = AppConfig::default();
        cfg.monitor.refractory_secs = -0.5;
        assert_eq!(cfg.validate(), Err(ConfigError::Refractory(-0.5)));

        cfg.monitor.refractory_secs = f64::INFINITY;
        assert!(cfg.validate().is_err());

        cfg.monitor.refractory_secs = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_section_keeps_other_keys() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("section.toml");
        std::fs::write(&path, "[monitor]\ntick_interval_ms = 50\n").expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.monitor.tick_interval_ms, 50);
        assert_eq!(cfg.monitor.frame_interval_ms, 16);
        assert_eq!(cfg.monitor.breath_threshold, 30.0);
    }
}
