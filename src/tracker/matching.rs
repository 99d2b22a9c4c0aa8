//! Matching utilities for centroid tracking.

use nalgebra::{Point2, distance_squared};
use ndarray::Array2;

/// Compute the squared Euclidean distance matrix between current centroids
/// (rows) and previously tracked centroids (columns).
pub fn squared_distance_matrix(current: &[Point2<f32>], previous: &[Point2<f32>]) -> Array2<f32> {
    let mut dists = Array2::zeros((current.len(), previous.len()));
    for (i, c) in current.iter().enumerate() {
        for (j, p) in previous.iter().enumerate() {
            dists[[i, j]] = distance_squared(c, p);
        }
    }
    dists
}

/// For each row, the column of the closest entry strictly below `thresh`.
///
/// Columns are scanned in order and a candidate replaces the current best
/// only when strictly closer, so the first of several equidistant columns
/// wins. Columns are not consumed: two rows may resolve to the same column.
pub fn greedy_nearest(cost_matrix: &Array2<f32>, thresh: f32) -> Vec<Option<usize>> {
    cost_matrix
        .rows()
        .into_iter()
        .map(|row| {
            let mut best: Option<(usize, f32)> = None;
            for (j, &d) in row.iter().enumerate() {
                if d >= thresh {
                    continue;
                }
                match best {
                    Some((_, best_d)) if d >= best_d => {}
                    _ => best = Some((j, d)),
                }
            }
            best.map(|(j, _)| j)
        })
        .collect()
}
