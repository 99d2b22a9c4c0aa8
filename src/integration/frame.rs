//! Captured frames and the sources that produce them.

use std::time::Instant;

use image::{GrayImage, RgbImage};

/// A captured frame, owned by whichever worker currently holds it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Monotonically increasing, starting at 1
    pub sequence_id: u64,
    pub captured_at: Instant,
    /// Mean absolute grayscale difference to the previous frame
    pub motion_score: f32,
}

/// A video source read by the capture worker.
pub trait FrameSource {
    type Error: std::fmt::Display;

    /// Read the next frame.
    ///
    /// `Ok(None)` means nothing was available this time (end of a file,
    /// a camera hiccup); the capture worker backs off and retries.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, Self::Error>;

    /// Native frame rate of a recorded source, used to pace reads.
    ///
    /// Live sources return `None` and are read as fast as they deliver.
    fn nominal_fps(&self) -> Option<f64> {
        None
    }
}

/// Mean absolute per-pixel difference between two grayscale frames.
///
/// Frames of different sizes score 0.
pub fn motion_score(previous: &GrayImage, current: &GrayImage) -> f32 {
    if previous.dimensions() != current.dimensions() || current.is_empty() {
        return 0.0;
    }
    let total: u64 = previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();
    total as f32 / current.as_raw().len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_motion_score_identical_frames() {
        let a = GrayImage::from_pixel(4, 4, Luma([100]));
        assert_eq!(motion_score(&a, &a.clone()), 0.0);
    }

    #[test]
    fn test_motion_score_mean_difference() {
        let a = GrayImage::from_pixel(2, 2, Luma([100]));
        let mut b = a.clone();
        b.put_pixel(0, 0, Luma([20]));
        b.put_pixel(1, 1, Luma([140]));
        // (80 + 40) / 4
        assert_eq!(motion_score(&a, &b), 30.0);
    }

    #[test]
    fn test_motion_score_size_mismatch() {
        let a = GrayImage::new(2, 2);
        let b = GrayImage::new(3, 2);
        assert_eq!(motion_score(&a, &b), 0.0);
    }
}
