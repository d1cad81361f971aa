//! Per-tick metric arithmetic: strength from a spectrum, composite quality.
//!
//! | Band      | Full marks           | Partial marks        | Otherwise |
//! |-----------|----------------------|----------------------|-----------|
//! | Strength  | 40–80 → +35          | 30–90 → +20          | 0         |
//! | Rhythm    | 12–20 RPM → +35      | 8–25 RPM → +20       | 0         |
//! | Duration  | ≥ 30 s → +30         | +1 per second        |           |
//!
//! The thresholds are empirical and kept exactly as tuned.

/// Full-scale reference for the mean spectrum byte (half of 255).
const STRENGTH_REFERENCE: f64 = 128.0;

/// Mean of a snapshot; an empty snapshot averages to zero.
pub fn mean(snapshot: &[u8]) -> f64 {
    if snapshot.is_empty() {
        return 0.0;
    }
    let sum: u64 = snapshot.iter().map(|&b| u64::from(b)).sum();
    sum as f64 / snapshot.len() as f64
}

/// Breath volume as a percentage: `clamp(round(average / 128 × 100), 0, 100)`.
///
/// ```
/// use breath_coach::monitor::quality::strength_from_average;
///
/// assert_eq!(strength_from_average(60.0), 47);
/// assert_eq!(strength_from_average(255.0), 100);
/// ```
pub fn strength_from_average(average: f64) -> u8 {
    let pct = (average / STRENGTH_REFERENCE * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Composite 0–100 score from the three independent bands above.
pub fn score_quality(strength: u8, rhythm: u32, duration_secs: u64) -> u8 {
    let strength_pts: u32 = match strength {
        40..=80 => 35,
        30..=90 => 20,
        _ => 0,
    };
    let rhythm_pts: u32 = match rhythm {
        12..=20 => 35,
        8..=25 => 20,
        _ => 0,
    };
    let duration_pts = duration_secs.min(30) as u32;

    (strength_pts + rhythm_pts + duration_pts).min(100) as u8
}
