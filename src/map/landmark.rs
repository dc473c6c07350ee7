//! Landmark - a triangulated 3D point anchored in the map.
//!
//! The map store reads nothing from a landmark beyond its identity; the
//! position is carried for the consumers that resolve landmark ids through
//! the map (visualization, tracking's local-map projection).

use nalgebra::Vector3;

use super::types::LandmarkId;

/// A 3D landmark owned by the map.
#[derive(Clone)]
pub struct Landmark {
    /// Unique identifier for this Landmark.
    pub id: LandmarkId,

    /// 3D position in world frame.
    pub position: Vector3<f64>,
}

impl Landmark {
    /// Create a new Landmark.
    pub fn new(id: LandmarkId, position: Vector3<f64>) -> Self {
        Self { id, position }
    }
}

impl std::fmt::Debug for Landmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Landmark")
            .field("id", &self.id)
            .field("position", &self.position)
            .finish()
    }
}
