//! Channel mixing for the capture callback.
//!
//! cpal delivers interleaved frames in whatever layout the device prefers;
//! the analyser works on a single mono stream at the device's native rate,
//! so only down-mixing is needed, no resampling.

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is dropped.
///
/// * If `channels == 1` the input is copied unchanged.
/// * If `channels == 0` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use breath_coach::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_copied() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn four_channel_average() {
        let input = vec![1.0_f32, 0.0, 0.0, 0.0, 0.4, 0.4, 0.4, 0.4];
        let out = downmix_to_mono(&input, 4);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.25).abs() < 1e-6);
        assert!((out[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn partial_trailing_frame_dropped() {
        let out = downmix_to_mono(&[0.2_f32, 0.4, 0.6], 2);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn zero_channels_is_empty() {
        assert!(downmix_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }
}
