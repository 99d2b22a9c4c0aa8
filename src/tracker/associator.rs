//! Pairs teeth detections with the bucket they belong to.

use crate::config::MonitorConfig;
use crate::tracker::detection::{ClassLabel, Detection};

/// Output of one association pass, both lists in detection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    pub buckets: Vec<Detection>,
    pub teeth: Vec<Detection>,
}

impl Association {
    /// The bucket used downstream: the largest box, first one on ties.
    pub fn primary_bucket(&self) -> Option<&Detection> {
        self.buckets.iter().fold(None, |best, det| match best {
            Some(b) if b.area() >= det.area() => Some(b),
            _ => Some(det),
        })
    }

    /// Area of the primary bucket, 0 when no bucket was detected.
    pub fn bucket_area(&self) -> f32 {
        self.primary_bucket().map_or(0.0, Detection::area)
    }

    pub fn teeth_areas(&self) -> Vec<f32> {
        self.teeth.iter().map(Detection::area).collect()
    }

    pub fn teeth_centroids(&self) -> Vec<(f32, f32)> {
        self.teeth.iter().map(Detection::centroid).collect()
    }
}

/// Stateless filter splitting a frame's detections into buckets and the
/// teeth that sit on one of them.
#[derive(Debug, Clone, Copy)]
pub struct DetectionAssociator {
    tooth_area_threshold: f32,
}

impl DetectionAssociator {
    pub fn new(tooth_area_threshold: f32) -> Self {
        Self {
            tooth_area_threshold,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.tooth_area_threshold)
    }

    /// Split `detections` by label and keep only teeth that are at least
    /// `tooth_area_threshold` in area and intersect a bucket box.
    pub fn associate(&self, detections: &[Detection]) -> Association {
        let buckets: Vec<Detection> = detections
            .iter()
            .filter(|d| d.label == ClassLabel::Bucket)
            .cloned()
            .collect();

        let teeth = detections
            .iter()
            .filter(|d| d.label == ClassLabel::Teeth)
            .filter(|d| d.area() >= self.tooth_area_threshold)
            .filter(|d| buckets.iter().any(|b| d.bbox.intersects(&b.bbox)))
            .cloned()
            .collect();

        Association { buckets, teeth }
    }
}
