//! Interfaces to collaborators the pipeline calls but does not implement.

use image::RgbImage;

/// Receives every captured frame with its motion score, e.g. to persist
/// snapshots while the shovel is working. The sink owns its own capture
/// interval policy.
pub trait SnapshotSink: Send {
    fn offer(&mut self, image: &RgbImage, motion_score: f32);
}

/// Decides whether a frame is worth running the detector on, e.g. a
/// day/night check. Frames it rejects are published unannotated and the
/// monitor sees an empty observation.
///
/// An empty observation has a bucket area of 0, so closing the gate during a
/// discharge ends it on the next frame. The cycle is then classified from the
/// teeth seen so far: `Incomplete` if it was too short, otherwise `Completed`
/// with a verdict that may be a `Warning` for a partially observed bucket.
pub trait ProcessingGate: Send {
    fn should_process(&mut self, image: &RgbImage) -> bool;
}

impl<F> SnapshotSink for F
where
    F: FnMut(&RgbImage, f32) + Send,
{
    fn offer(&mut self, image: &RgbImage, motion_score: f32) {
        self(image, motion_score)
    }
}

impl<F> ProcessingGate for F
where
    F: FnMut(&RgbImage) -> bool + Send,
{
    fn should_process(&mut self, image: &RgbImage) -> bool {
        self(image)
    }
}
