//! Frame-stream runner.
//!
//! Reads one landmark frame per line (JSON), analyzes it, writes one JSON
//! report per frame and feeds every score through an ingestion session into
//! the store.
//!
//! Accepted frame lines:
//!
//! - `null`: no face detected
//! - a [`LandmarkSet`] object: `{"pose": [[x, y], ..], "left_eye": .., "right_eye": ..}`
//! - a normalized face mesh: `{"mesh": [[x, y], ..]}`

use crate::{
    config::Config,
    detector::{AttentionDetector, FrameAnalysis},
    ingest::{IngestMessage, IngestSession},
    landmarks::LandmarkSet,
    store::AttentionStore,
    Error, Result,
};
use chrono::{SecondsFormat, Utc};
use log::{info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// One frame of landmark input
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FrameInput {
    /// Pipeline landmarks in pixels
    Landmarks(LandmarkSet),
    /// Full normalized face mesh
    Mesh {
        /// Mesh points in `[0, 1]` frame coordinates
        mesh: Vec<Point2<f64>>,
    },
}

/// Per-frame output line
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// Zero-based index among analyzed frames
    pub frame: usize,
    /// Timestamp recorded with the score
    pub timestamp: String,
    /// Analysis result
    pub analysis: FrameAnalysis,
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames analyzed
    pub frames: usize,
    /// Frames with a face
    pub faces: usize,
    /// Lines skipped as unreadable
    pub skipped: usize,
}

/// Main application struct
pub struct MonitorApp {
    detector: AttentionDetector,
    store: AttentionStore,
    identity: String,
}

impl MonitorApp {
    /// Create the application from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config, identity: impl Into<String>) -> Result<Self> {
        config.validate()?;
        let detector = AttentionDetector::new(config.detector.clone())?;
        let store = AttentionStore::with_window(config.store.window_size)?;

        Ok(Self {
            detector,
            store,
            identity: identity.into(),
        })
    }

    /// Store holding the recorded scores
    #[must_use]
    pub fn store(&self) -> &AttentionStore {
        &self.store
    }

    /// Identity scores are recorded under
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Process every frame line of `input`, writing reports to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails. Unreadable
    /// frame lines are skipped with a warning.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<RunSummary> {
        let mut session = IngestSession::new(self.identity.clone(), self.store.clone());
        let mut summary = RunSummary::default();

        for (line_no, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let analysis = match self.analyze_line(&line) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!("Skipping line {}: {}", line_no + 1, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let message = IngestMessage {
                score: analysis.score(),
                timestamp: timestamp.clone(),
            };
            session.handle(&serde_json::to_string(&message)?)?;

            let report = FrameReport {
                frame: summary.frames,
                timestamp,
                analysis,
            };
            serde_json::to_writer(&mut output, &report)?;
            writeln!(output)?;

            summary.frames += 1;
            if matches!(analysis, FrameAnalysis::Face { .. }) {
                summary.faces += 1;
            }
        }

        output.flush()?;
        info!(
            "Processed {} frames ({} with a face, {} skipped) for {}",
            summary.frames, summary.faces, summary.skipped, self.identity
        );
        Ok(summary)
    }

    fn analyze_line(&self, line: &str) -> Result<FrameAnalysis> {
        let frame: Option<FrameInput> = serde_json::from_str(line)?;

        match frame {
            None => Ok(self.detector.analyze(None)),
            Some(FrameInput::Landmarks(landmarks)) => {
                if !landmarks.is_finite() {
                    return Err(Error::InvalidInput("Landmarks must be finite".to_string()));
                }
                Ok(self.detector.analyze(Some(&landmarks)))
            }
            Some(FrameInput::Mesh { mesh }) => self.detector.analyze_face_mesh(Some(&mesh)),
        }
    }
}
