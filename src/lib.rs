//! Attention monitoring library for real-time per-person attention scoring.
//!
//! The library turns facial landmarks into an attention score and keeps a
//! bounded score history per tracked identity:
//!
//! 1. Head pose estimation using `PnP` (Perspective-n-Point) on six landmarks
//! 2. Eye openness from the eye aspect ratio of both eye contours
//! 3. A multiplicative scoring policy fusing both into a score in `[0, 1]`
//! 4. A concurrent rolling-window store fed by per-identity ingestion sessions
//!
//! Landmark detection, video capture, drawing and the network transport are
//! left to the caller.
//!
//! # Examples
//!
//! ## Scoring a Frame
//!
//! ```
//! use attention_monitor::{config::DetectorConfig, detector::AttentionDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = AttentionDetector::new(DetectorConfig::default())?;
//!
//! // No face in the frame
//! let analysis = detector.analyze(None);
//! assert_eq!(analysis.score(), 0.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Ingesting and Querying Scores
//!
//! ```
//! use attention_monitor::{ingest::IngestSession, query::QueryService, store::AttentionStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = AttentionStore::new();
//! let mut session = IngestSession::new("student_1", store.clone());
//!
//! let ack = session.handle(r#"{"score": 0.8, "timestamp": "2026-02-23T20:25:00Z"}"#)?;
//! assert!(ack.ack);
//!
//! let history = QueryService::new(store).scores("student_1", Some(10));
//! assert_eq!(history.scores.len(), 1);
//! # Ok(())
//! # }
//! ```

/// Landmark sets, camera intrinsics and face mesh extraction
pub mod landmarks;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Eye aspect ratio computation
pub mod eye_openness;

/// Attention scoring policy
pub mod scoring;

/// Per-frame attention pipeline
pub mod detector;

/// Concurrent per-identity score history
pub mod store;

/// Ingestion protocol and sessions
pub mod ingest;

/// Read-only query surface
pub mod query;

/// Error types and result handling
pub mod error;

/// Frame-stream application runner
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
