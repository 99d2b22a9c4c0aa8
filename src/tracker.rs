mod associator;
mod detection;
mod matching;
mod rect;
mod teeth_tracker;

pub use associator::{Association, DetectionAssociator};
pub use detection::{ClassLabel, Detection};
pub use matching::{greedy_nearest, squared_distance_matrix};
pub use rect::Rect;
pub use teeth_tracker::{IdPolicy, TeethTracker, TrackedTooth, assign};
