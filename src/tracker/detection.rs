//! Class-labelled detections produced by the detector for one frame.

use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;

/// Domain vocabulary of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassLabel {
    Bucket,
    Teeth,
    #[serde(other)]
    Other,
}

impl ClassLabel {
    /// Map a detector class name onto the domain vocabulary.
    ///
    /// Anything that is not `bucket` or `teeth` (case-insensitive) is `Other`.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("bucket") {
            Self::Bucket
        } else if name.eq_ignore_ascii_case("teeth") {
            Self::Teeth
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Teeth => "teeth",
            Self::Other => "other",
        }
    }
}

/// Detection input for association and tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: ClassLabel,
    /// Bounding box in full-resolution frame pixels
    pub bbox: Rect,
    /// Detection confidence score in [0, 1]
    pub confidence: f32,
}

impl Detection {
    pub fn new(label: ClassLabel, x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self {
            label,
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            confidence,
        }
    }

    pub fn from_rect(label: ClassLabel, bbox: Rect, confidence: f32) -> Self {
        Self {
            label,
            bbox,
            confidence,
        }
    }

    /// `(x2 - x1) * (y2 - y1)` of the box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }

    #[inline]
    pub fn centroid(&self) -> (f32, f32) {
        self.bbox.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_name() {
        assert_eq!(ClassLabel::from_name("bucket"), ClassLabel::Bucket);
        assert_eq!(ClassLabel::from_name("Teeth"), ClassLabel::Teeth);
        assert_eq!(ClassLabel::from_name("person"), ClassLabel::Other);
    }

    #[test]
    fn test_label_deserialize_unknown_is_other() {
        let label: ClassLabel = serde_json::from_str("\"truck\"").unwrap();
        assert_eq!(label, ClassLabel::Other);
        let label: ClassLabel = serde_json::from_str("\"bucket\"").unwrap();
        assert_eq!(label, ClassLabel::Bucket);
    }

    #[test]
    fn test_detection_area() {
        let det = Detection::new(ClassLabel::Teeth, 10.0, 20.0, 60.0, 80.0, 0.9);
        assert_eq!(det.area(), 3000.0);
        assert_eq!(det.centroid(), (35.0, 50.0));
    }
}
