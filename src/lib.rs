//! Excavator bucket discharge monitoring.
//!
//! Per frame, bucket and teeth detections are associated
//! ([`tracker::DetectionAssociator`]), teeth centroids are tracked across
//! frames while the bucket is discharging ([`tracker::TeethTracker`]) and a
//! hysteresis state machine ([`monitor::DischargeMonitor`]) classifies each
//! discharge by the number of teeth it saw. [`integration::Pipeline`] runs the
//! whole chain on a capture worker and a processing worker.

pub mod config;
pub mod integration;
pub mod monitor;
pub mod tracker;

pub use config::{Config, ConfigError, DisplaySettings, MonitorConfig, PipelineConfig};
pub use integration::{
    Detector, FrameAnalyzer, FrameProcessor, FrameSource, Pipeline, PipelineBuilder,
    PipelineError, ProcessedFrame,
};
pub use monitor::{DischargeEvent, DischargeMonitor, DischargePhase, Health};
pub use tracker::{ClassLabel, Detection, DetectionAssociator, IdPolicy, TeethTracker};
