//! Drawing detections and tracked teeth onto published frames.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;

use crate::tracker::{Association, Detection, Rect, TrackedTooth};

const BUCKET_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEETH_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTROID_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LINE_WIDTH: i32 = 2;

/// Draw bucket and associated teeth boxes plus a marker on every tracked
/// tooth centroid.
pub fn draw_association(image: &mut RgbImage, association: &Association, teeth: &[TrackedTooth]) {
    for bucket in &association.buckets {
        draw_box(image, &bucket.bbox, BUCKET_COLOR);
    }
    for tooth in &association.teeth {
        draw_box(image, &tooth.bbox, TEETH_COLOR);
    }
    for tooth in teeth {
        draw_cross_mut(
            image,
            CENTROID_COLOR,
            tooth.centroid.x.round() as i32,
            tooth.centroid.y.round() as i32,
        );
    }
}

fn draw_box(image: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    for inset in 0..LINE_WIDTH {
        let x = rect.x.round() as i32 + inset;
        let y = rect.y.round() as i32 + inset;
        let w = rect.width.round() as i32 - 2 * inset;
        let h = rect.height.round() as i32 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(image, PixelRect::at(x, y).of_size(w as u32, h as u32), color);
    }
}

/// Calibration lines listing every bucket and tooth area, numbered per class.
pub fn area_report(association: &Association) -> Vec<String> {
    let line = |kind: &str, (i, det): (usize, &Detection)| {
        format!("{} #{}: {}", kind, i + 1, det.area().round() as i64)
    };
    association
        .buckets
        .iter()
        .enumerate()
        .map(|entry| line("Bucket", entry))
        .chain(
            association
                .teeth
                .iter()
                .enumerate()
                .map(|entry| line("Teeth", entry)),
        )
        .collect()
}
