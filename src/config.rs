//! Configuration management for the attention monitor

use crate::{
    constants::{
        DEFAULT_EAR_THRESHOLD, DEFAULT_EYES_CLOSED_PENALTY, DEFAULT_HEAD_AWAY_PENALTY, DEFAULT_IMG_HEIGHT,
        DEFAULT_IMG_WIDTH, DEFAULT_PITCH_THRESHOLD, DEFAULT_QUERY_LIMIT, DEFAULT_WINDOW_SIZE, DEFAULT_YAW_THRESHOLD,
    },
    landmarks::CameraModel,
    scoring::ScoringPolicy,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detector configuration
    pub detector: DetectorConfig,

    /// Store configuration
    pub store: StoreConfig,
}

/// Camera and scoring parameters, fixed at detector construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Expected frame width in pixels
    pub img_width: u32,

    /// Expected frame height in pixels
    pub img_height: u32,

    /// Yaw threshold in degrees
    pub yaw_threshold: f64,

    /// Pitch threshold in degrees
    pub pitch_threshold: f64,

    /// Eye aspect ratio threshold
    pub ear_threshold: f64,

    /// Score multiplier when the head is turned away
    pub head_away_penalty: f64,

    /// Score multiplier when the eyes are closed
    pub eyes_closed_penalty: f64,

    /// Lens distortion `(k1, k2, p1, p2)`
    pub distortion: [f64; 4],
}

/// Store parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Records kept per identity
    pub window_size: usize,

    /// Records returned by a history query without an explicit limit
    pub default_query_limit: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            img_width: DEFAULT_IMG_WIDTH,
            img_height: DEFAULT_IMG_HEIGHT,
            yaw_threshold: DEFAULT_YAW_THRESHOLD,
            pitch_threshold: DEFAULT_PITCH_THRESHOLD,
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            head_away_penalty: DEFAULT_HEAD_AWAY_PENALTY,
            eyes_closed_penalty: DEFAULT_EYES_CLOSED_PENALTY,
            distortion: [0.0; 4],
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            default_query_limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

impl DetectorConfig {
    /// Camera intrinsics derived from the frame size
    #[must_use]
    pub fn camera(&self) -> CameraModel {
        CameraModel::pinhole(self.img_width, self.img_height).with_distortion(self.distortion)
    }

    /// Scoring policy derived from the thresholds
    #[must_use]
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            yaw_threshold: self.yaw_threshold,
            pitch_threshold: self.pitch_threshold,
            ear_threshold: self.ear_threshold,
            head_away_penalty: self.head_away_penalty,
            eyes_closed_penalty: self.eyes_closed_penalty,
        }
    }

    /// Validate detector settings
    ///
    /// # Errors
    ///
    /// Returns an error if the frame size is zero, a threshold is negative or
    /// non-finite, or a penalty lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.img_width == 0 || self.img_height == 0 {
            return Err(Error::ConfigError("Image width and height must be greater than 0".to_string()));
        }

        self.scoring_policy().validate()?;

        if self.distortion.iter().any(|d| !d.is_finite()) {
            return Err(Error::ConfigError("Distortion coefficients must be finite".to_string()));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;

        if self.store.window_size == 0 {
            return Err(Error::ConfigError("Window size must be greater than 0".to_string()));
        }
        if self.store.default_query_limit == 0 {
            return Err(Error::ConfigError("Default query limit must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Attention Monitor Configuration

# Camera and scoring
detector:
  img_width: 640
  img_height: 480
  yaw_threshold: 15.0
  pitch_threshold: 15.0
  ear_threshold: 0.22
  head_away_penalty: 0.5
  eyes_closed_penalty: 0.2
  distortion: [0.0, 0.0, 0.0, 0.0]

# Per-identity score history
store:
  window_size: 100
  default_query_limit: 20
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("detector:\n  img_width: 1280\n  ear_threshold: 0.2\n").unwrap();
        assert_eq!(config.detector.img_width, 1280);
        assert_eq!(config.detector.img_height, DEFAULT_IMG_HEIGHT);
        assert_eq!(config.detector.ear_threshold, 0.2);
        assert_eq!(config.store.window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn test_camera_from_config() {
        let camera = DetectorConfig::default().camera();
        assert_eq!(camera.fx, 640.0);
        assert_eq!(camera.cx, 320.0);
        assert_eq!(camera.cy, 240.0);
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = Config::default();
        config.detector.img_width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.yaw_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.eyes_closed_penalty = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.store.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        let result = Config::from_yaml("detector: [1, 2");
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }
}
