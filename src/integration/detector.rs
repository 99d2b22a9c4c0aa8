//! Trait for object detection inference backends.

use image::RgbImage;

use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any bucket/teeth detection model to the
/// monitor. Boxes must be in the pixel space of the image passed in, and
/// labels restricted to [`ClassLabel`](crate::tracker::ClassLabel).
///
/// # Example
///
/// ```ignore
/// use bucket_monitor::{Detection, Detector};
/// use image::RgbImage;
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl Detector for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait Detector {
    /// Error type for detection failures. Any error stops the pipeline.
    type Error;

    /// Run inference on a full-resolution frame.
    ///
    /// May block for as long as inference takes; no timeout is applied.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific or recorded outputs to
/// `Detection`.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}
