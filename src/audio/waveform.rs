//! Waveform polyline for the live amplitude display.
//!
//! The UI asks for [`WaveformData::from_amplitude`] once per frame and strokes
//! the resulting points.  Geometry only: no colours, no toolkit types.
//!
//! # Example
//!
//! ```rust
//! use breath_coach::audio::WaveformData;
//!
//! // Silence is a flat line through the vertical middle.
//! let w = WaveformData::from_amplitude(&[128; 64], 640.0, 200.0);
//! assert_eq!(w.points.len(), 65);
//! assert!(w.points.iter().all(|p| (p[1] - 100.0).abs() < 1e-3));
//! ```

/// Points of one waveform frame in widget-local coordinates (origin top-left).
#[derive(Debug, Clone, Default)]
pub struct WaveformData {
    /// `[x, y]` pairs, left to right.
    pub points: Vec<[f32; 2]>,
}

impl WaveformData {
    /// Lay `amplitude` bytes (128 = silence) across a `width` × `height` area.
    ///
    /// Sample `i` sits at `x = i × width / len`, `y = v / 128 × height / 2`.
    /// A final point at `(width, height / 2)` closes the line on the right
    /// edge.  An empty snapshot yields a flat centre line.
    pub fn from_amplitude(amplitude: &[u8], width: f32, height: f32) -> Self {
        let mid = height / 2.0;
        if amplitude.is_empty() {
            return Self {
                points: vec![[0.0, mid], [width, mid]],
            };
        }

        let slice_width = width / amplitude.len() as f32;
        let mut points: Vec<[f32; 2]> = amplitude
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let x = i as f32 * slice_width;
                let y = v as f32 / 128.0 * mid;
                [x, y]
            })
            .collect();
        points.push([width, mid]);

        Self { points }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
