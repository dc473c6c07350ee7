//! Core ID types for the map store.

/// Unique identifier for a KeyFrame.
///
/// KeyFrameIds are assigned by the tracking stage when a frame is promoted
/// to a keyframe. They serve as lightweight handles for cross-referencing
/// without needing Arc/Rc, which simplifies ownership and avoids cyclic
/// references: every other subsystem holds ids and resolves them through
/// the [`Map`](super::Map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyFrameId(pub u64);

impl KeyFrameId {
    /// Create a new KeyFrameId with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for KeyFrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KF{}", self.0)
    }
}

/// Unique identifier for a Landmark.
///
/// A Landmark is a triangulated 3D point observed by one or more KeyFrames.
/// The map store treats landmarks as opaque beyond their identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LandmarkId(pub u64);

impl LandmarkId {
    /// Create a new LandmarkId with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for LandmarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LM{}", self.0)
    }
}
