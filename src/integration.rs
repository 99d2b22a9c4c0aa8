//! Integration module connecting detectors and video sources to the monitor.
//!
//! The single-threaded chain lives in [`FrameProcessor`]; [`Pipeline`] runs it
//! on a processing worker fed by a capture worker through single-slot
//! mailboxes.

mod annotate;
mod builder;
mod collaborators;
mod detector;
mod frame;
mod mailbox;
mod pipeline;
mod processor;

pub use annotate::{area_report, draw_association};
pub use builder::DetectionBuilder;
pub use collaborators::{ProcessingGate, SnapshotSink};
pub use detector::{Detector, IntoDetections};
pub use frame::{Frame, FrameSource, motion_score};
pub use mailbox::Mailbox;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError, PipelineStats};
pub use processor::{Analysis, FrameAnalyzer, FrameProcessor, ProcessedFrame};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
