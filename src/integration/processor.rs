//! Single-threaded detection → association → tracking → monitoring chain.

use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info};

use crate::config::{ConfigError, DisplaySettings, MonitorConfig, PipelineConfig};
use crate::integration::annotate::{area_report, draw_association};
use crate::integration::detector::Detector;
use crate::integration::frame::Frame;
use crate::monitor::{DischargeEvent, DischargeMonitor, DischargePhase, Health, TimedEvent};
use crate::tracker::{Association, Detection, DetectionAssociator, TeethTracker, TrackedTooth};

/// Outcome of analysing one frame's detections.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub association: Association,
    pub bucket_area: f32,
    /// Tracked teeth; empty unless a discharge is in progress
    pub teeth: Vec<TrackedTooth>,
    /// Event emitted by this frame
    pub event: Option<DischargeEvent>,
    pub health: Health,
    pub phase: DischargePhase,
}

/// Association, tracking and discharge monitoring without a detector.
///
/// Teeth are only tracked while the monitor is discharging; outside a
/// discharge the tracker is reset every frame.
#[derive(Debug, Clone)]
pub struct FrameAnalyzer {
    associator: DetectionAssociator,
    tracker: TeethTracker,
    monitor: DischargeMonitor,
    min_confidence: f32,
}

impl FrameAnalyzer {
    pub fn new(monitor: MonitorConfig, pipeline: &PipelineConfig) -> Result<Self, ConfigError> {
        pipeline.validate()?;
        Ok(Self {
            associator: DetectionAssociator::from_config(&monitor),
            tracker: TeethTracker::new(monitor.tooth_match_distance_squared, pipeline.teeth_id_policy),
            monitor: DischargeMonitor::new(monitor)?,
            min_confidence: pipeline.min_confidence,
        })
    }

    pub fn analyze(&mut self, detections: &[Detection]) -> Analysis {
        self.analyze_at(Instant::now(), detections)
    }

    pub fn analyze_at(&mut self, now: Instant, detections: &[Detection]) -> Analysis {
        let confident: Vec<Detection> = detections
            .iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .cloned()
            .collect();

        let association = self.associator.associate(&confident);
        let bucket_area = association.bucket_area();
        let event = self
            .monitor
            .update_at(now, bucket_area, &association.teeth_areas());

        let teeth = if self.monitor.is_discharging() {
            self.tracker.update(&association.teeth_centroids()).to_vec()
        } else {
            self.tracker.reset();
            Vec::new()
        };

        debug!(
            detections = detections.len(),
            buckets = association.buckets.len(),
            teeth = association.teeth.len(),
            bucket_area,
            "frame analysed"
        );

        Analysis {
            association,
            bucket_area,
            teeth,
            event,
            health: self.monitor.health(),
            phase: self.monitor.phase(),
        }
    }

    pub fn monitor(&self) -> &DischargeMonitor {
        &self.monitor
    }

    pub fn tracker(&self) -> &TeethTracker {
        &self.tracker
    }
}

/// Status published for the display after every processed frame.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub sequence_id: u64,
    pub captured_at: Instant,
    pub processed_at: Instant,
    pub health: Health,
    pub phase: DischargePhase,
    /// Most recent event, carried forward until a newer one replaces it
    pub latest_event: Option<TimedEvent>,
    pub bucket_area: f32,
    pub teeth: Vec<TrackedTooth>,
    /// Per-box areas when calibration display is enabled
    pub area_report: Vec<String>,
    pub annotated: RgbImage,
    /// False when the processing gate skipped detection
    pub inferred: bool,
}

/// A detector bundled with a [`FrameAnalyzer`].
///
/// Owned by the processing worker; the tracker and monitor state inside it is
/// never shared.
pub struct FrameProcessor<D: Detector> {
    detector: D,
    analyzer: FrameAnalyzer,
    latest_event: Option<TimedEvent>,
}

impl<D: Detector> FrameProcessor<D> {
    pub fn new(
        detector: D,
        monitor: MonitorConfig,
        pipeline: &PipelineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            detector,
            analyzer: FrameAnalyzer::new(monitor, pipeline)?,
            latest_event: None,
        })
    }

    /// Process a single frame and build the status to publish.
    ///
    /// With `infer == false` the detector is skipped and the monitor sees a
    /// frame without detections.
    pub fn process(
        &mut self,
        frame: Frame,
        settings: &DisplaySettings,
        infer: bool,
    ) -> Result<ProcessedFrame, D::Error> {
        let detections = if infer {
            self.detector.detect(&frame.image)?
        } else {
            Vec::new()
        };

        let now = Instant::now();
        let analysis = self.analyzer.analyze_at(now, &detections);
        if let Some(event) = analysis.event {
            self.latest_event = Some(TimedEvent::new(event, now));
        }

        let mut annotated = frame.image;
        if infer && settings.draw_boxes {
            draw_association(&mut annotated, &analysis.association, &analysis.teeth);
        }

        let area_report = if settings.show_area_values {
            let report = area_report(&analysis.association);
            if !report.is_empty() {
                info!(sequence_id = frame.sequence_id, areas = ?report, "calibration areas");
            }
            report
        } else {
            Vec::new()
        };

        Ok(ProcessedFrame {
            sequence_id: frame.sequence_id,
            captured_at: frame.captured_at,
            processed_at: now,
            health: analysis.health,
            phase: analysis.phase,
            latest_event: self.latest_event,
            bucket_area: analysis.bucket_area,
            teeth: analysis.teeth,
            area_report,
            annotated,
            inferred: infer,
        })
    }

    pub fn analyzer(&self) -> &FrameAnalyzer {
        &self.analyzer
    }
}
