//! Map module - the shared map store of the SLAM pipeline.
//!
//! This module contains:
//! - [`KeyFrame`] - Retained camera poses with covisibility connections
//! - [`Landmark`] - Triangulated 3D points, referenced by identity
//! - [`Map`] - The thread-safe registry every pipeline stage goes through
//!
//! # Architecture
//!
//! The [`Map`] is the single synchronization point of the pipeline.
//! Tracking, local mapping, loop closing and visualization each hold an
//! `Arc<Map>`; every operation serializes on one exclusive lock and
//! snapshot reads return independent copies. Entities are owned by the
//! map and addressed by [`KeyFrameId`] / [`LandmarkId`] handles.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::Isometry3;
//! use vslam_map::map::{KeyFrame, KeyFrameId, Map};
//!
//! let map = Arc::new(Map::new());
//!
//! map.add_keyframe(KeyFrame::new(KeyFrameId::new(0), 0, Isometry3::identity()));
//! assert_eq!(map.keyframe_count(), 1);
//! assert_eq!(map.max_keyframe_id(), 0);
//! ```

pub mod keyframe;
pub mod landmark;
pub mod map;
pub mod types;

pub use keyframe::KeyFrame;
pub use landmark::Landmark;
pub use map::Map;
pub use types::{KeyFrameId, LandmarkId};
