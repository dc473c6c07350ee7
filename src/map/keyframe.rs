//! KeyFrame - a retained camera pose anchoring the map graph.
//!
//! The map store only sees the graph-facing slice of a keyframe:
//! - Identity and pose
//! - Spanning-tree parent
//! - Covisibility connections (edge weight = number of shared landmarks)
//!
//! Feature extraction, descriptors and matching live in the tracking and
//! mapping stages and never enter this crate.

use std::collections::HashMap;

use nalgebra::{Isometry3, Vector3};

use super::types::KeyFrameId;

/// A KeyFrame held by the map.
///
/// KeyFrames are the nodes of the covisibility graph. The tracking stage
/// constructs one, fills in its graph relationships, and hands it to the
/// [`Map`](super::Map), which owns it from then on.
#[derive(Clone)]
pub struct KeyFrame {
    /// Unique identifier for this KeyFrame.
    pub id: KeyFrameId,

    /// Timestamp in nanoseconds.
    pub timestamp_ns: u64,

    /// Pose: transform from camera to world (T_wc).
    pub pose: Isometry3<f64>,

    /// Parent KeyFrame in the spanning tree.
    /// None for a root KeyFrame (typically the first of a session).
    pub parent_id: Option<KeyFrameId>,

    /// Covisibility connections: connected KeyFrame → number of shared
    /// landmarks. This is the adjacency list of the covisibility graph.
    connections: HashMap<KeyFrameId, i32>,
}

impl KeyFrame {
    /// Create a new KeyFrame with no graph relationships.
    pub fn new(id: KeyFrameId, timestamp_ns: u64, pose: Isometry3<f64>) -> Self {
        Self {
            id,
            timestamp_ns,
            pose,
            parent_id: None,
            connections: HashMap::new(),
        }
    }

    /// Get the camera position in world frame.
    pub fn camera_center(&self) -> Vector3<f64> {
        self.pose.translation.vector
    }

    /// Set the parent KeyFrame in the spanning tree.
    pub fn set_parent(&mut self, parent_id: KeyFrameId) {
        self.parent_id = Some(parent_id);
    }

    /// Check if this is a root KeyFrame (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Covisibility Graph
    // ─────────────────────────────────────────────────────────────────────────

    /// Add or update a covisibility connection.
    ///
    /// # Arguments
    /// * `kf_id` - The connected KeyFrame
    /// * `weight` - Number of shared landmarks
    pub fn add_connection(&mut self, kf_id: KeyFrameId, weight: i32) {
        if kf_id == self.id {
            return; // Don't connect to self
        }
        self.connections.insert(kf_id, weight);
    }

    /// Remove a covisibility connection.
    ///
    /// Returns true if the connection existed and was removed.
    pub fn erase_connection(&mut self, kf_id: KeyFrameId) -> bool {
        self.connections.remove(&kf_id).is_some()
    }

    /// Get the edge weight with another KeyFrame (0 if not connected).
    pub fn weight_of(&self, kf_id: KeyFrameId) -> i32 {
        self.connections.get(&kf_id).copied().unwrap_or(0)
    }

    /// Iterate over all connections as (connected id, weight) pairs.
    pub fn connections(&self) -> impl Iterator<Item = (KeyFrameId, i32)> + '_ {
        self.connections.iter().map(|(&id, &w)| (id, w))
    }

    /// Get the number of covisibility connections.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }
}

impl std::fmt::Debug for KeyFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFrame")
            .field("id", &self.id)
            .field("timestamp_ns", &self.timestamp_ns)
            .field("parent_id", &self.parent_id)
            .field("connections", &self.connections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_keyframe(id: u64) -> KeyFrame {
        KeyFrame::new(KeyFrameId::new(id), 1000000 * id, Isometry3::identity())
    }

    #[test]
    fn test_connections() {
        let mut kf = create_test_keyframe(1);

        kf.add_connection(KeyFrameId::new(2), 50);
        kf.add_connection(KeyFrameId::new(3), 100);

        assert_eq!(kf.num_connections(), 2);
        assert_eq!(kf.weight_of(KeyFrameId::new(2)), 50);
        assert_eq!(kf.weight_of(KeyFrameId::new(5)), 0); // Not connected

        // Updating an existing connection replaces the weight
        kf.add_connection(KeyFrameId::new(2), 60);
        assert_eq!(kf.weight_of(KeyFrameId::new(2)), 60);
        assert_eq!(kf.num_connections(), 2);

        assert!(kf.erase_connection(KeyFrameId::new(2)));
        assert!(!kf.erase_connection(KeyFrameId::new(2))); // Already removed
        assert_eq!(kf.num_connections(), 1);
    }

    #[test]
    fn test_no_self_connection() {
        let mut kf = create_test_keyframe(1);
        kf.add_connection(KeyFrameId::new(1), 100); // Try to connect to self
        assert_eq!(kf.weight_of(KeyFrameId::new(1)), 0);
        assert_eq!(kf.num_connections(), 0);
    }

    #[test]
    fn test_spanning_tree_parent() {
        let mut kf = create_test_keyframe(2);

        assert!(kf.is_root());

        kf.set_parent(KeyFrameId::new(1));
        assert!(!kf.is_root());
        assert_eq!(kf.parent_id, Some(KeyFrameId::new(1)));
    }

    #[test]
    fn test_camera_center() {
        let pose = Isometry3::translation(1.0, 2.0, 3.0);
        let kf = KeyFrame::new(KeyFrameId::new(0), 0, pose);
        assert_eq!(kf.camera_center(), Vector3::new(1.0, 2.0, 3.0));
    }
}
