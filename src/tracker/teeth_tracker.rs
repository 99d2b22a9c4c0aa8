//! Nearest-centroid identity tracking for bucket teeth.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::tracker::matching::{greedy_nearest, squared_distance_matrix};

/// A tooth with a stable identity in the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedTooth {
    /// Identity, starting at 1
    pub id: u32,
    pub centroid: Point2<f32>,
}

impl TrackedTooth {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            id,
            centroid: Point2::new(x, y),
        }
    }
}

/// What happens to the id counter when the tracker is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// Ids keep increasing for the lifetime of the tracker.
    #[default]
    Monotonic,
    /// Ids restart at 1 after every reset, numbering teeth per discharge.
    PerDischarge,
}

/// Assign ids to this frame's centroids by matching them against the
/// previous frame's tracked teeth.
///
/// Each current centroid, in order, takes the id of the closest previous
/// tooth whose squared distance is strictly below `match_distance_squared`
/// (first closest wins ties), otherwise a fresh id from `next_id`. Matching is
/// not exclusive; when two centroids resolve to one id the later centroid
/// replaces the earlier entry in place.
///
/// Returns the updated tracked set and the next free id.
pub fn assign(
    current: &[(f32, f32)],
    previous: &[TrackedTooth],
    mut next_id: u32,
    match_distance_squared: f32,
) -> (Vec<TrackedTooth>, u32) {
    let current_points: Vec<Point2<f32>> =
        current.iter().map(|&(x, y)| Point2::new(x, y)).collect();
    let previous_points: Vec<Point2<f32>> = previous.iter().map(|t| t.centroid).collect();

    let dists = squared_distance_matrix(&current_points, &previous_points);
    let matches = greedy_nearest(&dists, match_distance_squared);

    let mut updated: Vec<TrackedTooth> = Vec::with_capacity(current.len());
    for (centroid, matched) in current_points.into_iter().zip(matches) {
        let id = match matched {
            Some(j) => previous[j].id,
            None => {
                let id = next_id;
                next_id += 1;
                id
            }
        };

        match updated.iter_mut().find(|t| t.id == id) {
            Some(existing) => existing.centroid = centroid,
            None => updated.push(TrackedTooth { id, centroid }),
        }
    }

    (updated, next_id)
}

/// Stateful wrapper around [`assign`] holding the previous frame's teeth.
///
/// Owned by a single caller; it is not meant to be shared between threads.
#[derive(Debug, Clone)]
pub struct TeethTracker {
    tracked: Vec<TrackedTooth>,
    next_id: u32,
    match_distance_squared: f32,
    id_policy: IdPolicy,
}

impl TeethTracker {
    pub fn new(match_distance_squared: f32, id_policy: IdPolicy) -> Self {
        Self {
            tracked: Vec::new(),
            next_id: 1,
            match_distance_squared,
            id_policy,
        }
    }

    /// Track one frame of teeth centroids and return the tracked set.
    pub fn update(&mut self, centroids: &[(f32, f32)]) -> &[TrackedTooth] {
        let (tracked, next_id) = assign(
            centroids,
            &self.tracked,
            self.next_id,
            self.match_distance_squared,
        );
        trace!(
            teeth = tracked.len(),
            new_ids = next_id - self.next_id,
            "teeth tracked"
        );
        self.tracked = tracked;
        self.next_id = next_id;
        &self.tracked
    }

    /// Forget the tracked set. The id counter restarts only under
    /// [`IdPolicy::PerDischarge`].
    pub fn reset(&mut self) {
        self.tracked.clear();
        if self.id_policy == IdPolicy::PerDischarge {
            self.next_id = 1;
        }
    }

    pub fn tracked(&self) -> &[TrackedTooth] {
        &self.tracked
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }
}
