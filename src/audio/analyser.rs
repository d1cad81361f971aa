//! Byte snapshots from a window of raw samples.
//!
//! [`SpectrumAnalyser`] turns the most recent `fft_size` mono samples into
//! the two fixed-length byte arrays the breath monitor consumes, following
//! the conventions of a browser analyser node:
//!
//! | Snapshot   | Length         | Value                                         |
//! |------------|----------------|-----------------------------------------------|
//! | frequency  | `fft_size / 2` | smoothed magnitude, `[min_db, max_db]` → 0–255 |
//! | amplitude  | `fft_size / 2` | `128 × (1 + sample)`, clamped to 0–255        |
//!
//! The magnitude pass is an in-place radix-2 FFT over precomputed twiddle and
//! bit-reversal tables.

use std::f32::consts::PI;

use crate::config::AudioConfig;

/// Stateful spectrum analyser.  The smoothing state carries over between
/// calls, so use one analyser per stream and [`reset`](Self::reset) it when
/// the stream restarts.
#[derive(Debug, Clone)]
pub struct SpectrumAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    /// `cos(2πk/n)` and `sin(2πk/n)` for `k < n/2`.
    cos_table: Vec<f32>,
    sin_table: Vec<f32>,
    bit_reverse: Vec<usize>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    /// # Panics
    ///
    /// Panics if `fft_size` is not a power of two ≥ 2.  Run
    /// [`AppConfig::validate`](crate::config::AppConfig::validate) first.
    pub fn new(config: &AudioConfig) -> Self {
        let n = config.fft_size;
        assert!(
            n >= 2 && n.is_power_of_two(),
            "fft_size must be a power of two >= 2"
        );

        // Blackman window, alpha = 0.16.
        let window = (0..n)
            .map(|i| {
                let x = i as f32 / n as f32;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        let cos_table = (0..n / 2)
            .map(|i| (2.0 * PI * i as f32 / n as f32).cos())
            .collect();
        let sin_table = (0..n / 2)
            .map(|i| (2.0 * PI * i as f32 / n as f32).sin())
            .collect();

        let shift = usize::BITS - n.trailing_zeros();
        let bit_reverse = (0..n).map(|i| i.reverse_bits() >> shift).collect();

        Self {
            fft_size: n,
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window,
            cos_table,
            sin_table,
            bit_reverse,
            smoothed: vec![0.0; n / 2],
        }
    }

    /// Samples consumed per analysis.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Values produced per snapshot.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Frequency snapshot of `samples`.
    ///
    /// `samples` should hold exactly `fft_size` values, oldest first; a
    /// shorter slice is treated as zero-padded at the front and a longer one
    /// is truncated to its newest `fft_size` values.
    pub fn frequency_bytes(&mut self, samples: &[f32]) -> Vec<u8> {
        let magnitudes = self.magnitudes(&self.frame(samples));

        let tau = self.smoothing;
        let range = self.max_decibels - self.min_decibels;

        magnitudes
            .into_iter()
            .enumerate()
            .map(|(k, magnitude)| {
                let smoothed = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
                self.smoothed[k] = smoothed;

                if smoothed <= 0.0 {
                    return 0;
                }
                let db = 20.0 * smoothed.log10();
                let scaled = 255.0 / range * (db - self.min_decibels);
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// Amplitude snapshot: the newest `bin_count` samples as bytes.
    pub fn time_domain_bytes(&self, samples: &[f32]) -> Vec<u8> {
        let frame = self.frame(samples);
        frame[self.fft_size - self.bin_count()..]
            .iter()
            .map(|s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Windowed spectrum magnitudes of `frame` for the lower half of the bins,
    /// scaled by `1 / fft_size`.
    fn magnitudes(&self, frame: &[f32]) -> Vec<f32> {
        let n = self.fft_size;
        let mut re: Vec<f32> = self
            .bit_reverse
            .iter()
            .map(|&j| frame[j] * self.window[j])
            .collect();
        let mut im = vec![0.0_f32; n];

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let (c, s) = (self.cos_table[k * stride], self.sin_table[k * stride]);
                    let (a, b) = (start + k, start + k + half);
                    // Multiply by e^(-2πik/len).
                    let tr = re[b] * c + im[b] * s;
                    let ti = im[b] * c - re[b] * s;
                    re[b] = re[a] - tr;
                    im[b] = im[a] - ti;
                    re[a] += tr;
                    im[a] += ti;
                }
            }
            len *= 2;
        }

        (0..self.bin_count())
            .map(|k| (re[k] * re[k] + im[k] * im[k]).sqrt() / n as f32)
            .collect()
    }

    /// Exactly `fft_size` samples, front-padded or truncated.
    fn frame(&self, samples: &[f32]) -> Vec<f32> {
        let n = self.fft_size;
        if samples.len() >= n {
            samples[samples.len() - n..].to_vec()
        } else {
            let mut frame = vec![0.0; n - samples.len()];
            frame.extend_from_slice(samples);
            frame
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn analyser(fft_size: usize) -> SpectrumAnalyser {
        SpectrumAnalyser::new(&AudioConfig {
            fft_size,
            ..AudioConfig::default()
        })
    }

    fn sine_at_bin(bin: usize, n: usize, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * bin as f32 * i as f32 / n as f32).sin())
            .collect()
    }

    #[test]
    fn snapshot_lengths_are_half_the_window() {
        let mut a = analyser(256);
        assert_eq!(a.bin_count(), 128);
        assert_eq!(a.frequency_bytes(&[0.0; 256]).len(), 128);
        assert_eq!(a.time_domain_bytes(&[0.0; 256]).len(), 128);
    }

    #[test]
    fn silence_is_all_zero_spectrum() {
        let mut a = analyser(256);
        let bytes = a.frequency_bytes(&[0.0; 256]);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn loud_tone_peaks_at_its_bin() {
        let mut a = analyser(256);
        let bytes = a.frequency_bytes(&sine_at_bin(16, 256, 1.0));

        assert_eq!(bytes[16], 255);
        assert!(bytes[100] < bytes[16], "far bin {} vs peak", bytes[100]);
    }

    #[test]
    fn magnitudes_match_direct_transform() {
        let n = 64;
        let a = analyser(n);
        let frame: Vec<f32> = (0..n)
            .map(|i| ((i * 7 % 13) as f32 - 6.0) / 6.0 + 0.3 * (i as f32 * 0.9).sin())
            .collect();

        let fast = a.magnitudes(&frame);
        for (k, got) in fast.iter().enumerate() {
            let (mut re, mut im) = (0.0_f32, 0.0_f32);
            for (i, x) in frame.iter().enumerate() {
                let phase = 2.0 * PI * (k * i) as f32 / n as f32;
                re += x * a.window[i] * phase.cos();
                im -= x * a.window[i] * phase.sin();
            }
            let want = (re * re + im * im).sqrt() / n as f32;
            assert!((got - want).abs() < 1e-4, "bin {k}: {got} vs {want}");
        }
    }

    #[test]
    fn two_sample_window() {
        let mut a = analyser(2);
        assert_eq!(a.frequency_bytes(&[0.0, 0.0]), vec![0]);
    }

    #[test]
    fn smoothing_carries_over_until_reset() {
        let mut a = analyser(256);
        let tone = sine_at_bin(16, 256, 0.001);

        let first = a.frequency_bytes(&tone)[16];
        let second = a.frequency_bytes(&tone)[16];
        assert!(second > first, "smoothed level should rise: {first} → {second}");

        a.reset();
        assert_eq!(a.frequency_bytes(&tone)[16], first);
    }

    #[test]
    fn short_input_is_front_padded() {
        let mut a = analyser(64);
        let bytes = a.frequency_bytes(&[0.0; 10]);
        assert_eq!(bytes.len(), 32);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn time_domain_maps_silence_to_midpoint() {
        let a = analyser(64);
        let bytes = a.time_domain_bytes(&[0.0; 64]);
        assert!(bytes.iter().all(|&b| b == 128));
    }

    #[test]
    fn time_domain_clamps_and_uses_newest_samples() {
        let a = analyser(4);
        // Oldest half is ignored; newest half is -1.0 and +1.0.
        let bytes = a.time_domain_bytes(&[0.5, 0.5, -1.0, 1.0]);
        assert_eq!(bytes, vec![0, 255]);
    }

    #[test]
    #[should_panic(expected = "fft_size must be a power of two")]
    fn non_power_of_two_panics() {
        analyser(1000);
    }
}
