use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_COOLDOWN_MS, DEFAULT_FOCAL_LENGTH_PX, DEFAULT_KNOWN_WIDTH_CM, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_SAFE_DISTANCE_CM,
};

/// Accepted `target_fps` range: one frame per 1000 s up to one per ms.
const MIN_TARGET_FPS: f64 = 0.001;
const MAX_TARGET_FPS: f64 = 1000.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Session constants. Fixed once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub focal_length_px: f64,
    pub known_width_cm: f64,
    pub safe_distance_cm: f64,
    pub min_confidence: f64,
    pub cooldown_ms: u64,
    pub target_fps: Option<f64>,
    pub frame_width: Option<u32>,
    pub frame_height: Option<u32>,
    pub detect_timeout_ms: Option<u64>,
    pub font_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub model_url: Option<String>,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            focal_length_px: DEFAULT_FOCAL_LENGTH_PX,
            known_width_cm: DEFAULT_KNOWN_WIDTH_CM,
            safe_distance_cm: DEFAULT_SAFE_DISTANCE_CM,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            target_fps: None,
            frame_width: None,
            frame_height: None,
            detect_timeout_ms: None,
            font_path: None,
            model_path: None,
            model_url: None,
        }
    }
}

impl ProximityConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.focal_length_px > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Focal length must be positive, got {}",
                self.focal_length_px
            )));
        }
        if !(self.known_width_cm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Known object width must be positive, got {}",
                self.known_width_cm
            )));
        }
        if !(self.safe_distance_cm >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "Safe distance must not be negative, got {}",
                self.safe_distance_cm
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.min_confidence
            )));
        }
        if let Some(fps) = self.target_fps {
            if !(MIN_TARGET_FPS..=MAX_TARGET_FPS).contains(&fps) {
                return Err(ConfigError::Invalid(format!(
                    "Target frame rate must be in [{MIN_TARGET_FPS}, {MAX_TARGET_FPS}], got {fps}"
                )));
            }
        }
        match (self.frame_width, self.frame_height) {
            (Some(0), _) | (_, Some(0)) => {
                return Err(ConfigError::Invalid(
                    "Frame dimensions must be positive".to_string(),
                ))
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "Frame width and height must be set together".to_string(),
                ))
            }
            _ => {}
        }
        if self.detect_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "Detection timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn detect_timeout(&self) -> Option<Duration> {
        self.detect_timeout_ms.map(Duration::from_millis)
    }

    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.frame_width.zip(self.frame_height)
    }

    /// Minimum spacing between emitted frames, if a frame rate is set.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.target_fps
            .and_then(|fps| Duration::try_from_secs_f64(1.0 / fps).ok())
    }
}
