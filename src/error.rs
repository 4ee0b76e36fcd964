//! Error types for the attention monitor library.
//!
//! Numeric failures inside the scoring pipeline (pose solver divergence,
//! degenerate eye geometry) never surface here. They are recovered with
//! deterministic fallback values where they happen. Only structurally invalid
//! external input and I/O end up as an [`Error`].

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML encoding or decoding failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingestion payload rejected by schema validation
    #[error("Malformed ingestion message: {0}")]
    MalformedMessage(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
