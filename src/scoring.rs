//! Attention scoring policy.
//!
//! The score starts at 1.0 and is multiplied down by independent penalties:
//! one when the head is turned away past the yaw or pitch threshold, one when
//! the eyes are closed. Both together compound (1.0 → 0.5 → 0.1 with the
//! default multipliers).

use crate::{
    constants::{
        DEFAULT_EAR_THRESHOLD, DEFAULT_EYES_CLOSED_PENALTY, DEFAULT_HEAD_AWAY_PENALTY, DEFAULT_PITCH_THRESHOLD,
        DEFAULT_YAW_THRESHOLD,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Thresholds and multipliers of the scoring policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Absolute yaw (degrees) above which the head counts as turned away
    pub yaw_threshold: f64,
    /// Absolute pitch (degrees) above which the head counts as turned away
    pub pitch_threshold: f64,
    /// Eye aspect ratio below which the eyes count as closed
    pub ear_threshold: f64,
    /// Multiplier applied when the head is turned away
    pub head_away_penalty: f64,
    /// Multiplier applied when the eyes are closed
    pub eyes_closed_penalty: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            head_away_penalty: DEFAULT_HEAD_AWAY_PENALTY,
            eyes_closed_penalty: DEFAULT_EYES_CLOSED_PENALTY,
        }
    }
}

impl ScoringPolicy {
    /// Validate thresholds and penalties
    ///
    /// # Errors
    ///
    /// Returns an error if a threshold is negative or non-finite, or a
    /// penalty lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("yaw_threshold", self.yaw_threshold),
            ("pitch_threshold", self.pitch_threshold),
            ("ear_threshold", self.ear_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!("{name} must be a non-negative number, got {value}")));
            }
        }

        for (name, value) in [
            ("head_away_penalty", self.head_away_penalty),
            ("eyes_closed_penalty", self.eyes_closed_penalty),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0, got {value}")));
            }
        }

        Ok(())
    }
}

/// Fuses head pose and eye openness into a score in `[0, 1]`
#[derive(Debug, Clone, Copy, Default)]
pub struct AttentionScorer {
    policy: ScoringPolicy,
}

impl AttentionScorer {
    /// Create a scorer with the given policy
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use
    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Whether the pose counts as looking away. Non-finite angles do.
    #[must_use]
    pub fn is_head_away(&self, yaw: f64, pitch: f64) -> bool {
        !(yaw.abs() <= self.policy.yaw_threshold && pitch.abs() <= self.policy.pitch_threshold)
    }

    /// Whether the eye aspect ratio counts as closed. A non-finite ratio does.
    #[must_use]
    pub fn are_eyes_closed(&self, ear: f64) -> bool {
        !(ear >= self.policy.ear_threshold)
    }

    /// Score one observation. Always in `[0, 1]`; a policy that produces a
    /// NaN score yields 0.0.
    #[must_use]
    pub fn score(&self, yaw: f64, pitch: f64, ear: f64) -> f64 {
        let mut score = 1.0;
        if self.is_head_away(yaw, pitch) {
            score *= self.policy.head_away_penalty;
        }
        if self.are_eyes_closed(ear) {
            score *= self.policy.eyes_closed_penalty;
        }
        if score.is_nan() {
            return 0.0;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Score with explicit thresholds and the default penalty multipliers
#[must_use]
pub fn attention_score(
    yaw: f64,
    pitch: f64,
    ear: f64,
    yaw_threshold: f64,
    pitch_threshold: f64,
    ear_threshold: f64,
) -> f64 {
    AttentionScorer::new(ScoringPolicy {
        yaw_threshold,
        pitch_threshold,
        ear_threshold,
        ..ScoringPolicy::default()
    })
    .score(yaw, pitch, ear)
}
