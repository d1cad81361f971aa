//! Microphone capture via `cpal`.
//!
//! [`MicrophoneSource`] is the production [`AudioSource`].  On
//! [`connect`](AudioSource::connect) it spawns an `audio-capture` thread that
//! builds and owns the cpal stream (`cpal::Stream` is not `Send` on every
//! platform, so it never leaves that thread).  The stream callback down-mixes
//! each buffer to mono and appends it to a shared [`RingBuffer`] holding the
//! latest `fft_size` samples; snapshots are computed from that window on
//! demand by a [`SpectrumAnalyser`].
//!
//! ```text
//! cpal callback ──downmix──▶ Arc<Mutex<RingBuffer<f32>>> ◀── frequency_snapshot()
//!                                                        ◀── amplitude_snapshot()
//! ```

use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use super::analyser::SpectrumAnalyser;
use super::buffer::RingBuffer;
use super::downmix::downmix_to_mono;
use super::source::{AudioSource, CaptureError, SnapshotError};
use crate::config::AudioConfig;

/// Latest mono samples, shared between the cpal callback and the analyser.
type SharedSamples = Arc<Mutex<RingBuffer<f32>>>;

/// First error reported by the cpal error callback, if any.
type StreamFault = Arc<Mutex<Option<String>>>;

// ---------------------------------------------------------------------------
// cpal error classification
// ---------------------------------------------------------------------------

/// Map a backend-specific description onto the capture taxonomy.
///
/// Backends only report permission problems as free text ("Permission
/// denied" from ALSA, "not authorized" from CoreAudio, …).
fn classify_backend(description: &str) -> CaptureError {
    let lower = description.to_lowercase();
    if ["permission", "denied", "not authorized", "not permitted", "access"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        CaptureError::PermissionDenied
    } else if ["busy", "in use", "exclusive"]
        .iter()
        .any(|needle| lower.contains(needle))
    {
        CaptureError::DeviceBusy
    } else {
        CaptureError::Unknown(description.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for CaptureError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        match err {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceBusy,
            cpal::DefaultStreamConfigError::BackendSpecific { err } => {
                classify_backend(&err.description)
            }
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

impl From<cpal::BuildStreamError> for CaptureError {
    fn from(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceBusy,
            cpal::BuildStreamError::BackendSpecific { err } => classify_backend(&err.description),
            other => CaptureError::Unknown(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for CaptureError {
    fn from(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceBusy,
            cpal::PlayStreamError::BackendSpecific { err } => classify_backend(&err.description),
        }
    }
}

impl From<cpal::DevicesError> for CaptureError {
    fn from(err: cpal::DevicesError) -> Self {
        match err {
            cpal::DevicesError::BackendSpecific { err } => classify_backend(&err.description),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream construction (runs on the capture thread)
// ---------------------------------------------------------------------------

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    match name {
        None => host.default_input_device().ok_or(CaptureError::Unavailable),
        Some(wanted) => host
            .input_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or(CaptureError::Unavailable),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: SharedSamples,
    fault: StreamFault,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let as_f32: Vec<f32> = data.iter().map(|&s| s.to_sample::<f32>()).collect();
            let mono = downmix_to_mono(&as_f32, channels);
            samples
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_slice(&mono);
        },
        move |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
            let mut slot = fault.lock().unwrap_or_else(PoisonError::into_inner);
            slot.get_or_insert_with(|| err.to_string());
        },
        None,
    )?;
    Ok(stream)
}

fn open_stream(
    device_name: Option<&str>,
    samples: SharedSamples,
    fault: StreamFault,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;
    let supported = device.default_input_config()?;
    let format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    log::info!(
        "audio: opening '{}' ({} Hz, {} ch, {:?})",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate.0,
        config.channels,
        format
    );

    let stream = match format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, samples, fault)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, samples, fault)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, samples, fault)?,
        cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, samples, fault)?,
        other => {
            return Err(CaptureError::Unknown(format!(
                "unsupported sample format {other:?}"
            )))
        }
    };
    stream.play()?;
    Ok(stream)
}

// ---------------------------------------------------------------------------
// CaptureThread
// ---------------------------------------------------------------------------

/// RAII guard for the thread that owns the cpal stream.
///
/// Dropping it signals the thread, which drops the stream and exits.
struct CaptureThread {
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureThread {
    fn spawn(
        device_name: Option<String>,
        samples: SharedSamples,
        fault: StreamFault,
    ) -> Result<Self, CaptureError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), samples, fault) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Returns on an explicit stop or when the guard is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("audio: capture thread exiting");
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                stop_tx,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unknown(
                    "capture thread exited before opening the stream".into(),
                ))
            }
        }
    }
}

impl Drop for CaptureThread {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("audio: capture thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MicrophoneSource
// ---------------------------------------------------------------------------

/// [`AudioSource`] backed by the system microphone.
///
/// # Example
///
/// ```rust,no_run
/// use breath_coach::audio::{AudioSource, MicrophoneSource};
/// use breath_coach::config::AudioConfig;
///
/// let mut mic = MicrophoneSource::new(AudioConfig::default());
/// mic.connect().unwrap();
/// let spectrum = mic.frequency_snapshot().unwrap();
/// assert_eq!(spectrum.len(), 1024);
/// mic.disconnect();
/// ```
pub struct MicrophoneSource {
    config: AudioConfig,
    samples: SharedSamples,
    fault: StreamFault,
    analyser: SpectrumAnalyser,
    capture: Option<CaptureThread>,
}

impl MicrophoneSource {
    pub fn new(config: AudioConfig) -> Self {
        let analyser = SpectrumAnalyser::new(&config);
        Self {
            samples: Arc::new(Mutex::new(RingBuffer::new(config.fft_size))),
            fault: Arc::new(Mutex::new(None)),
            analyser,
            capture: None,
            config,
        }
    }

    /// Names of all input devices on the default host, for the settings file.
    pub fn input_device_names() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        Ok(host
            .input_devices()?
            .filter_map(|d| d.name().ok())
            .collect())
    }

    pub fn is_connected(&self) -> bool {
        self.capture.is_some()
    }

    /// The current analysis window, or the reason there is none.
    fn window(&self) -> Result<Vec<f32>, SnapshotError> {
        if self.capture.is_none() {
            return Err(SnapshotError::Disconnected);
        }
        if let Some(msg) = self
            .fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(SnapshotError::Stream(msg));
        }
        let samples = self
            .samples
            .lock()
            .map_err(|_| SnapshotError::Stream("sample buffer poisoned".into()))?;
        Ok(samples.latest(self.analyser.fft_size()))
    }
}

impl AudioSource for MicrophoneSource {
    fn connect(&mut self) -> Result<(), CaptureError> {
        if self.capture.is_some() {
            return Ok(());
        }

        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.analyser.reset();

        let thread = CaptureThread::spawn(
            self.config.input_device.clone(),
            Arc::clone(&self.samples),
            Arc::clone(&self.fault),
        )?;
        self.capture = Some(thread);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.capture.take().is_some() {
            log::info!("audio: microphone released");
        }
    }

    fn frequency_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError> {
        let window = self.window()?;
        Ok(self.analyser.frequency_bytes(&window))
    }

    fn amplitude_snapshot(&mut self) -> Result<Vec<u8>, SnapshotError> {
        let window = self.window()?;
        Ok(self.analyser.time_domain_bytes(&window))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
