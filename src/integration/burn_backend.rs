//! Burn inference backend for bucket and teeth detection.
//!
//! `BurnDetector` resizes each frame to the model input, runs the forward pass
//! and maps class ids and boxes back into frame space.
//!
//! # Example
//!
//! ```ignore
//! use bucket_monitor::integration::{BurnDetector, BurnModel, RawDetection};
//! use burn::backend::NdArray;
//!
//! struct BucketYolo { /* ... */ }
//!
//! impl BurnModel<NdArray> for BucketYolo {
//!     fn forward(&self, input: burn::tensor::Tensor<NdArray, 4>) -> Vec<RawDetection> {
//!         // Run inference and NMS
//!     }
//! }
//!
//! let detector = BurnDetector::new(BucketYolo::load("bucket.bin"), Default::default())
//!     .with_class_names(["bucket", "teeth"]);
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use image::RgbImage;
use image::imageops::{FilterType, resize};
use thiserror::Error;

use super::{DetectionBuilder, Detector};
use crate::tracker::{ClassLabel, Detection};

#[derive(Debug, Clone, Error)]
pub enum BurnDetectorError {
    #[error("model expects {expected} input channels, only RGB (3) is supported")]
    UnsupportedChannels { expected: u32 },
    #[error("empty frame ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
}

/// Raw detection output from the model, after NMS.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box in model input pixels: [x1, y1, x2, y2] or [cx, cy, w, h]
    pub bbox: [f32; 4],
    pub score: f32,
    /// Index into the detector's class names
    pub class_id: usize,
}

/// Trait for Burn-based detection models.
pub trait BurnModel<B: Backend>: Send {
    /// Run forward pass on a `[1, 3, height, width]` tensor scaled to [0, 1].
    fn forward(&self, input: Tensor<B, 4>) -> Vec<RawDetection>;

    /// Expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 640, 640)
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        true
    }
}

/// Burn-based object detector implementing [`Detector`].
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    class_names: Vec<String>,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a detector with the default `bucket`, `teeth` class order.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            class_names: vec!["bucket".into(), "teeth".into()],
        }
    }

    /// Class names in model output order. Unknown names map to
    /// [`ClassLabel::Other`] and are ignored downstream.
    pub fn with_class_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_names = names.into_iter().map(Into::into).collect();
        self
    }

    fn label(&self, class_id: usize) -> ClassLabel {
        self.class_names
            .get(class_id)
            .map_or(ClassLabel::Other, |name| ClassLabel::from_name(name))
    }

    /// Resize to the model input and lay the pixels out as CHW.
    pub fn preprocess(&self, image: &RgbImage) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let (channels, target_h, target_w) = self.model.input_size();
        if channels != 3 {
            return Err(BurnDetectorError::UnsupportedChannels { expected: channels });
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(BurnDetectorError::EmptyFrame {
                width: image.width(),
                height: image.height(),
            });
        }

        let resized = resize(image, target_w, target_h, FilterType::Triangle);
        let plane = (target_w * target_h) as usize;
        let mut data = vec![0.0f32; plane * 3];
        for (i, pixel) in resized.pixels().enumerate() {
            for (c, value) in pixel.0.iter().enumerate() {
                data[c * plane + i] = f32::from(*value) / 255.0;
            }
        }

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            target_h as usize,
            target_w as usize,
        ]))
    }

    fn postprocess(&self, raw: Vec<RawDetection>, sx: f32, sy: f32) -> Vec<Detection> {
        raw.into_iter()
            .map(|d| {
                let builder = DetectionBuilder::new()
                    .label(self.label(d.class_id))
                    .confidence(d.score);
                let builder = if self.model.bbox_is_xywh() {
                    builder.xywh(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                } else {
                    builder.tlbr(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                };
                builder.scale(sx, sy).build()
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> Detector for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(image)?;
        let (_, model_h, model_w) = self.model.input_size();
        let sx = image.width() as f32 / model_w as f32;
        let sy = image.height() as f32 / model_h as f32;
        let raw = self.model.forward(tensor);
        Ok(self.postprocess(raw, sx, sy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    struct FixedModel;

    impl BurnModel<NdArray> for FixedModel {
        fn forward(&self, input: Tensor<NdArray, 4>) -> Vec<RawDetection> {
            assert_eq!(input.dims(), [1, 3, 64, 64]);
            vec![
                RawDetection {
                    bbox: [32.0, 32.0, 20.0, 10.0],
                    score: 0.9,
                    class_id: 0,
                },
                RawDetection {
                    bbox: [10.0, 10.0, 4.0, 4.0],
                    score: 0.6,
                    class_id: 7,
                },
            ]
        }

        fn input_size(&self) -> (u32, u32, u32) {
            (3, 64, 64)
        }
    }

    #[test]
    fn test_boxes_scaled_to_frame() {
        let mut detector = BurnDetector::<NdArray, _>::new(FixedModel, Default::default());
        let detections = detector.detect(&RgbImage::new(128, 32)).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, ClassLabel::Bucket);
        assert_eq!(detections[0].bbox.to_tlbr(), [44.0, 13.5, 84.0, 18.5]);
        assert_eq!(detections[1].label, ClassLabel::Other);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let mut detector = BurnDetector::<NdArray, _>::new(FixedModel, Default::default());
        assert!(matches!(
            detector.detect(&RgbImage::new(0, 0)),
            Err(BurnDetectorError::EmptyFrame { .. })
        ));
    }
}
