//! Per-frame attention pipeline.
//!
//! [`AttentionDetector`] combines pose estimation, eye openness and the
//! scoring policy. It never draws anything; the returned [`FrameAnalysis`]
//! carries the numbers an overlay renderer needs.

use crate::{
    config::DetectorConfig,
    eye_openness::average_eye_aspect_ratio,
    landmarks::LandmarkSet,
    pose_estimation::{Pose, PoseEstimator},
    scoring::AttentionScorer,
    Result,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Result of analyzing one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameAnalysis {
    /// No face in the frame; the score is zero
    NoFace,
    /// A face was analyzed
    Face {
        /// Head orientation
        pose: Pose,
        /// Eye aspect ratio averaged over both eyes
        ear: f64,
        /// Attention score in `[0, 1]`
        score: f64,
    },
}

impl FrameAnalysis {
    /// Attention score of the frame
    #[must_use]
    pub fn score(&self) -> f64 {
        match self {
            Self::NoFace => 0.0,
            Self::Face { score, .. } => *score,
        }
    }
}

/// Attention detector for a fixed camera configuration
#[derive(Debug, Clone)]
pub struct AttentionDetector {
    config: DetectorConfig,
    pose_estimator: PoseEstimator,
    scorer: AttentionScorer,
}

impl AttentionDetector {
    /// Create a detector
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Initializing AttentionDetector for {}x{} frames (yaw<={}, pitch<={}, ear>={})",
            config.img_width,
            config.img_height,
            config.yaw_threshold,
            config.pitch_threshold,
            config.ear_threshold
        );

        Ok(Self {
            pose_estimator: PoseEstimator::new(config.camera()),
            scorer: AttentionScorer::new(config.scoring_policy()),
            config,
        })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyze one frame's landmarks, `None` meaning no face was detected
    #[must_use]
    pub fn analyze(&self, landmarks: Option<&LandmarkSet>) -> FrameAnalysis {
        let Some(landmarks) = landmarks else {
            return FrameAnalysis::NoFace;
        };

        let pose = self.pose_estimator.estimate(&landmarks.pose);
        let ear = average_eye_aspect_ratio(&landmarks.left_eye, &landmarks.right_eye);
        let score = self.scorer.score(pose.yaw, pose.pitch, ear);

        log::trace!(
            "yaw={:.1} pitch={:.1} roll={:.1} ear={:.3} score={:.2}",
            pose.yaw,
            pose.pitch,
            pose.roll,
            ear,
            score
        );

        FrameAnalysis::Face { pose, ear, score }
    }

    /// Analyze a normalized face mesh scaled to the configured frame size
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is too short to contain the landmarks.
    pub fn analyze_face_mesh(&self, mesh: Option<&[Point2<f64>]>) -> Result<FrameAnalysis> {
        match mesh {
            None => Ok(FrameAnalysis::NoFace),
            Some(mesh) => {
                let landmarks = LandmarkSet::from_face_mesh(mesh, self.config.img_width, self.config.img_height)?;
                Ok(self.analyze(Some(&landmarks)))
            }
        }
    }
}
