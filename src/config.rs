//! Configuration for the discharge monitor and the frame pipeline.
//!
//! Every threshold of [`MonitorConfig`] is required: a missing value is a
//! parse error, never a silent default. Configurations are immutable once
//! validated; runtime changes build a new value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracker::IdPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
    #[error(
        "enter_area_threshold ({enter}) must be greater than exit_area_threshold ({exit})"
    )]
    InvertedHysteresis { enter: f32, exit: f32 },
    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Thresholds driving association, tracking and the discharge state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Bucket area (px²) above which a discharge starts
    pub enter_area_threshold: f32,
    /// Bucket area (px²) below which a discharge ends
    pub exit_area_threshold: f32,
    /// Minimum discharge duration for the health verdict to be updated
    pub min_discharge_seconds: f64,
    /// Alternative minimum in processed frames
    pub min_discharge_frames: u64,
    /// Teeth smaller than this (px²) are noise
    pub tooth_area_threshold: f32,
    /// Fewer teeth than this at the peak of a discharge is a warning
    pub tooth_min_count: u32,
    /// Squared centroid distance (px²) under which a tooth keeps its id
    pub tooth_match_distance_squared: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enter_area_threshold: 165_000.0,
            exit_area_threshold: 113_000.0,
            min_discharge_seconds: 2.0,
            min_discharge_frames: 60,
            tooth_area_threshold: 2600.0,
            tooth_min_count: 5,
            tooth_match_distance_squared: 24_000.0,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("enter_area_threshold", self.enter_area_threshold as f64)?;
        check_threshold("exit_area_threshold", self.exit_area_threshold as f64)?;
        check_threshold("min_discharge_seconds", self.min_discharge_seconds)?;
        check_threshold("tooth_area_threshold", self.tooth_area_threshold as f64)?;
        check_threshold(
            "tooth_match_distance_squared",
            self.tooth_match_distance_squared as f64,
        )?;

        if self.enter_area_threshold <= self.exit_area_threshold {
            return Err(ConfigError::InvertedHysteresis {
                enter: self.enter_area_threshold,
                exit: self.exit_area_threshold,
            });
        }
        Ok(())
    }
}

fn check_threshold(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

/// Worker pacing and detector post-filtering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Capture pacing when the source reports no usable frame rate, in (1, 120]
    pub fallback_fps: f64,
    /// Sleep when the processing worker finds no new frame
    pub idle_backoff_ms: u64,
    /// Sleep after a failed or empty source read
    pub source_error_backoff_ms: u64,
    /// Detections below this confidence are discarded
    pub min_confidence: f32,
    pub teeth_id_policy: IdPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_fps: 30.0,
            idle_backoff_ms: 20,
            source_error_backoff_ms: 20,
            min_confidence: 0.45,
            teeth_id_policy: IdPolicy::Monotonic,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fallback_fps > 1.0 && self.fallback_fps <= 120.0) {
            return Err(ConfigError::OutOfRange {
                name: "fallback_fps",
                value: self.fallback_fps,
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::OutOfRange {
                name: "min_confidence",
                value: self.min_confidence as f64,
            });
        }
        Ok(())
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn source_error_backoff(&self) -> Duration {
        Duration::from_millis(self.source_error_backoff_ms)
    }
}

/// Presentation switches that may change while the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplaySettings {
    /// Draw bucket and teeth boxes on the published frame
    pub draw_boxes: bool,
    /// Publish and log per-box areas for threshold calibration
    pub show_area_values: bool,
    /// How long the display keeps showing an event
    pub event_ttl_ms: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            draw_boxes: true,
            show_area_values: false,
            event_ttl_ms: 3000,
        }
    }
}

impl DisplaySettings {
    pub fn event_ttl(&self) -> Duration {
        Duration::from_millis(self.event_ttl_ms)
    }
}

/// Complete configuration as read from a JSON file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub display: DisplaySettings,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()?;
        self.pipeline.validate()
    }
}
