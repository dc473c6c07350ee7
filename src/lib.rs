pub mod map;

pub use map::{KeyFrame, KeyFrameId, Landmark, LandmarkId, Map};
