//! Textual feedback derived from the session metrics.
//!
//! Everything here is a pure function of `(strength, rhythm, duration,
//! quality)`; the UI renders whatever [`Evaluation::from_metrics`] returns.

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Traffic-light marker shown next to a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Good,
    Caution,
    Poor,
}

// ---------------------------------------------------------------------------
// QualityLabel
// ---------------------------------------------------------------------------

/// Overall grade of the composite quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLabel {
    /// ≥ 80
    Excellent,
    /// ≥ 60
    Good,
    /// ≥ 40
    Fair,
    /// < 40
    NeedsImprovement,
}

impl QualityLabel {
    pub fn from_score(quality: u8) -> Self {
        match quality {
            80..=u8::MAX => QualityLabel::Excellent,
            60..=79 => QualityLabel::Good,
            40..=59 => QualityLabel::Fair,
            _ => QualityLabel::NeedsImprovement,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Fair => "Fair",
            QualityLabel::NeedsImprovement => "Needs improvement",
        }
    }

    /// Bar colour as `(r, g, b)`.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            QualityLabel::Excellent => (0x48, 0xbb, 0x78),
            QualityLabel::Good => (0xec, 0xc9, 0x4b),
            QualityLabel::Fair => (0xed, 0x89, 0x36),
            QualityLabel::NeedsImprovement => (0xf5, 0x65, 0x65),
        }
    }

    /// One-sentence encouragement shown under the overall grade.
    pub fn advice(&self) -> &'static str {
        match self {
            QualityLabel::Excellent => {
                "Excellent work! Keep up this level of breath control."
            }
            QualityLabel::Good => "Good progress. Focus on keeping a steady rhythm.",
            QualityLabel::Fair | QualityLabel::NeedsImprovement => {
                "Keep practising. Try to breathe in a more controlled, steady way."
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-metric hints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthHint {
    BreatheHarder,
    EaseOff,
    GoodControl,
}

impl StrengthHint {
    pub fn from_strength(strength: u8) -> Self {
        if strength < 30 {
            StrengthHint::BreatheHarder
        } else if strength > 85 {
            StrengthHint::EaseOff
        } else {
            StrengthHint::GoodControl
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            StrengthHint::BreatheHarder => "breathe harder",
            StrengthHint::EaseOff => "ease off",
            StrengthHint::GoodControl => "good control",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StrengthHint::BreatheHarder => Severity::Poor,
            StrengthHint::EaseOff => Severity::Caution,
            StrengthHint::GoodControl => Severity::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmHint {
    IncreaseRate,
    SlowDown,
    Adequate,
}

impl RhythmHint {
    /// `None` until the first breath has produced a rate.
    pub fn from_rhythm(rhythm: u32) -> Option<Self> {
        match rhythm {
            0 => None,
            1..=9 => Some(RhythmHint::IncreaseRate),
            10..=22 => Some(RhythmHint::Adequate),
            _ => Some(RhythmHint::SlowDown),
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            RhythmHint::IncreaseRate => "increase rate",
            RhythmHint::SlowDown => "slow down",
            RhythmHint::Adequate => "adequate",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RhythmHint::IncreaseRate => Severity::Poor,
            RhythmHint::SlowDown => Severity::Caution,
            RhythmHint::Adequate => Severity::Good,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationHint {
    KeepGoing,
    GoodDuration,
}

impl DurationHint {
    pub fn from_duration(duration_secs: u64) -> Self {
        if duration_secs < 20 {
            DurationHint::KeepGoing
        } else {
            DurationHint::GoodDuration
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            DurationHint::KeepGoing => "keep going",
            DurationHint::GoodDuration => "good duration",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DurationHint::KeepGoing => Severity::Caution,
            DurationHint::GoodDuration => Severity::Good,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// All labels for one set of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub quality: QualityLabel,
    pub strength: StrengthHint,
    pub rhythm: Option<RhythmHint>,
    pub duration: DurationHint,
}

impl Evaluation {
    pub fn from_metrics(strength: u8, rhythm: u32, duration_secs: u64, quality: u8) -> Self {
        Self {
            quality: QualityLabel::from_score(quality),
            strength: StrengthHint::from_strength(strength),
            rhythm: RhythmHint::from_rhythm(rhythm),
            duration: DurationHint::from_duration(duration_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// BarLevels
// ---------------------------------------------------------------------------

/// Fill percentages (0–100) of the four metric bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLevels {
    pub strength: f32,
    /// A full bar is one minute.
    pub duration: f32,
    /// A full bar is 25 breaths per minute.
    pub rhythm: f32,
    pub quality: f32,
}

impl BarLevels {
    pub fn from_metrics(strength: u8, rhythm: u32, duration_secs: u64, quality: u8) -> Self {
        Self {
            strength: f32::from(strength),
            duration: (duration_secs as f32 / 60.0 * 100.0).min(100.0),
            rhythm: (rhythm as f32 / 25.0 * 100.0).min(100.0),
            quality: f32::from(quality),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_label_thresholds() {
        assert_eq!(QualityLabel::from_score(100), QualityLabel::Excellent);
        assert_eq!(QualityLabel::from_score(80), QualityLabel::Excellent);
        assert_eq!(QualityLabel::from_score(79), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(60), QualityLabel::Good);
        assert_eq!(QualityLabel::from_score(59), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_score(40), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_score(39), QualityLabel::NeedsImprovement);
        assert_eq!(QualityLabel::from_score(0), QualityLabel::NeedsImprovement);
    }

    #[test]
    fn quality_label_text() {
        assert_eq!(QualityLabel::Excellent.label(), "Excellent");
        assert_eq!(QualityLabel::Good.label(), "Good");
        assert_eq!(QualityLabel::Fair.label(), "Fair");
        assert_eq!(QualityLabel::NeedsImprovement.label(), "Needs improvement");
    }

    #[test]
    fn fair_and_poor_share_advice() {
        assert_eq!(
            QualityLabel::Fair.advice(),
            QualityLabel::NeedsImprovement.advice()
        );
        assert_ne!(QualityLabel::Good.advice(), QualityLabel::Fair.advice());
    }

    #[test]
    fn quality_colours() {
        assert_eq!(QualityLabel::Excellent.rgb(), (72, 187, 120));
        assert_eq!(QualityLabel::NeedsImprovement.rgb(), (245, 101, 101));
    }

    #[test]
    fn strength_hints() {
        assert_eq!(StrengthHint::from_strength(29), StrengthHint::BreatheHarder);
        assert_eq!(StrengthHint::from_strength(30), StrengthHint::GoodControl);
        assert_eq!(StrengthHint::from_strength(85), StrengthHint::GoodControl);
        assert_eq!(StrengthHint::from_strength(86), StrengthHint::EaseOff);
        assert_eq!(StrengthHint::BreatheHarder.text(), "breathe harder");
        assert_eq!(StrengthHint::EaseOff.severity(), Severity::Caution);
    }

    #[test]
    fn rhythm_hints() {
        assert_eq!(RhythmHint::from_rhythm(0), None);
        assert_eq!(RhythmHint::from_rhythm(9), Some(RhythmHint::IncreaseRate));
        assert_eq!(RhythmHint::from_rhythm(10), Some(RhythmHint::Adequate));
        assert_eq!(RhythmHint::from_rhythm(22), Some(RhythmHint::Adequate));
        assert_eq!(RhythmHint::from_rhythm(23), Some(RhythmHint::SlowDown));
        assert_eq!(RhythmHint::SlowDown.text(), "slow down");
    }

    #[test]
    fn duration_hints() {
        assert_eq!(DurationHint::from_duration(19), DurationHint::KeepGoing);
        assert_eq!(DurationHint::from_duration(20), DurationHint::GoodDuration);
        assert_eq!(DurationHint::KeepGoing.text(), "keep going");
        assert_eq!(DurationHint::GoodDuration.severity(), Severity::Good);
    }

    #[test]
    fn evaluation_of_ideal_session() {
        let e = Evaluation::from_metrics(47, 15, 35, 100);
        assert_eq!(e.quality, QualityLabel::Excellent);
        assert_eq!(e.strength, StrengthHint::GoodControl);
        assert_eq!(e.rhythm, Some(RhythmHint::Adequate));
        assert_eq!(e.duration, DurationHint::GoodDuration);
    }

    #[test]
    fn evaluation_before_first_breath() {
        let e = Evaluation::from_metrics(20, 0, 10, 10);
        assert_eq!(e.quality, QualityLabel::NeedsImprovement);
        assert_eq!(e.strength, StrengthHint::BreatheHarder);
        assert_eq!(e.rhythm, None);
        assert_eq!(e.duration, DurationHint::KeepGoing);
    }

    #[test]
    fn bar_levels_scale_and_cap() {
        let bars = BarLevels::from_metrics(47, 15, 30, 88);
        assert_eq!(bars.strength, 47.0);
        assert_eq!(bars.duration, 50.0);
        assert!((bars.rhythm - 60.0).abs() < 1e-4);
        assert_eq!(bars.quality, 88.0);

        let capped = BarLevels::from_metrics(100, 60, 600, 100);
        assert_eq!(capped.duration, 100.0);
        assert_eq!(capped.rhythm, 100.0);
    }
}
