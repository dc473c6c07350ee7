//! Map - the shared store of KeyFrames and Landmarks.
//!
//! One `Map` is constructed at pipeline startup and shared as `Arc<Map>`
//! between the tracking, local mapping, loop closing and visualization
//! threads. It provides:
//! - Owning storage of KeyFrames and Landmarks, keyed by id
//! - A monotone keyframe-id watermark
//! - The replaceable reference-landmark working set used by tracking
//! - A big-change generation counter for downstream consumers
//! - Point-in-time snapshots of its collections
//! - Serialization of the keyframe covisibility graph
//!
//! # Concurrency
//!
//! Every operation takes a single exclusive lock for its whole duration,
//! so all calls are serialized against each other and every snapshot read
//! observes an atomic view of the collections. `save` is the one
//! disproportionately expensive operation: it captures the graph under the
//! lock and performs the disk I/O after releasing it, so a save never
//! stalls the other stages for the duration of the write.
//!
//! # Ownership
//!
//! The Map is the authoritative owner of its entities. Other subsystems
//! hold plain ids and resolve them through the Map; an id whose entity has
//! been erased resolves to `None`. `erase_keyframe`/`erase_landmark` hand
//! the removed entity back to the caller; only `clear` drops everything.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::keyframe::KeyFrame;
use super::landmark::Landmark;
use super::types::{KeyFrameId, LandmarkId};

/// Parent-id sentinel written for a root KeyFrame.
const NO_PARENT: u64 = u64::MAX;

/// All map state, guarded by the single coarse lock.
struct MapInner {
    /// All KeyFrames in the map, keyed by id.
    keyframes: HashMap<KeyFrameId, KeyFrame>,

    /// All Landmarks in the map, keyed by id.
    landmarks: HashMap<LandmarkId, Landmark>,

    /// Working set of landmarks currently relevant to tracking.
    /// Replaced wholesale by `set_reference_landmarks`.
    reference_landmarks: Vec<LandmarkId>,

    /// First keyframe of each tracking session.
    keyframe_origins: Vec<KeyFrameId>,

    /// Highest keyframe id ever inserted. Never decreases from insertion;
    /// reset only by `clear`.
    max_keyframe_id: u64,

    /// Generation counter bumped by `inform_new_big_change`, never by
    /// ordinary add/erase.
    big_change_idx: u64,

    /// Dense landmark index, valid only immediately after
    /// `rebuild_landmark_index`. Not maintained across add/erase.
    landmark_index: HashMap<LandmarkId, u64>,
}

impl MapInner {
    fn new() -> Self {
        Self {
            keyframes: HashMap::new(),
            landmarks: HashMap::new(),
            reference_landmarks: Vec::new(),
            keyframe_origins: Vec::new(),
            max_keyframe_id: 0,
            big_change_idx: 0,
            landmark_index: HashMap::new(),
        }
    }
}

/// The shared SLAM map store.
///
/// All methods take `&self`; interior state is guarded by one exclusive
/// lock. Share between threads as `Arc<Map>`.
pub struct Map {
    inner: Mutex<MapInner>,
}

impl Map {
    /// Create a new empty Map.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MapInner::new()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // KeyFrame membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a KeyFrame to the map, taking ownership of it.
    ///
    /// No-op if a KeyFrame with the same id is already present (the stored
    /// entity is kept). The id watermark is raised either way.
    pub fn add_keyframe(&self, kf: KeyFrame) {
        let mut inner = self.inner.lock();
        if kf.id.0 > inner.max_keyframe_id {
            inner.max_keyframe_id = kf.id.0;
        }
        inner.keyframes.entry(kf.id).or_insert(kf);
    }

    /// Remove a KeyFrame from the map, handing it back to the caller.
    ///
    /// No-op on an absent id. Other keyframes may still hold connections
    /// referencing the erased id; those resolve to `None` on lookup.
    pub fn erase_keyframe(&self, id: KeyFrameId) -> Option<KeyFrame> {
        self.inner.lock().keyframes.remove(&id)
    }

    /// Get a point-in-time copy of a KeyFrame.
    pub fn keyframe(&self, id: KeyFrameId) -> Option<KeyFrame> {
        self.inner.lock().keyframes.get(&id).cloned()
    }

    /// Run a closure on a stored KeyFrame under the map lock.
    ///
    /// Used by local mapping to maintain graph relationships after
    /// insertion. Returns `None` if the id is absent.
    pub fn with_keyframe_mut<R>(
        &self,
        id: KeyFrameId,
        f: impl FnOnce(&mut KeyFrame) -> R,
    ) -> Option<R> {
        self.inner.lock().keyframes.get_mut(&id).map(f)
    }

    /// Set the covisibility edge between two keyframes, symmetrically.
    ///
    /// No-op unless both endpoints are present in the map.
    pub fn connect_keyframes(&self, a: KeyFrameId, b: KeyFrameId, weight: i32) {
        let mut inner = self.inner.lock();
        if !inner.keyframes.contains_key(&a) || !inner.keyframes.contains_key(&b) {
            return;
        }
        if let Some(kf) = inner.keyframes.get_mut(&a) {
            kf.add_connection(b, weight);
        }
        if let Some(kf) = inner.keyframes.get_mut(&b) {
            kf.add_connection(a, weight);
        }
    }

    /// Get an independent snapshot of all KeyFrame ids.
    ///
    /// The order is unspecified and not stable across calls. The returned
    /// vector is a copy; mutating the map afterwards does not affect it.
    pub fn all_keyframes(&self) -> Vec<KeyFrameId> {
        self.inner.lock().keyframes.keys().copied().collect()
    }

    /// Current number of KeyFrames in the map.
    pub fn keyframe_count(&self) -> usize {
        self.inner.lock().keyframes.len()
    }

    /// Highest KeyFrame id ever added (0 for a fresh or cleared map).
    pub fn max_keyframe_id(&self) -> u64 {
        self.inner.lock().max_keyframe_id
    }

    /// Record the first keyframe of a tracking session.
    pub fn push_keyframe_origin(&self, id: KeyFrameId) {
        self.inner.lock().keyframe_origins.push(id);
    }

    /// Snapshot of the recorded session-origin keyframes.
    pub fn keyframe_origins(&self) -> Vec<KeyFrameId> {
        self.inner.lock().keyframe_origins.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Landmark membership
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a Landmark to the map, taking ownership of it.
    ///
    /// No-op if a Landmark with the same id is already present.
    pub fn add_landmark(&self, lm: Landmark) {
        let mut inner = self.inner.lock();
        inner.landmarks.entry(lm.id).or_insert(lm);
    }

    /// Remove a Landmark from the map, handing it back to the caller.
    ///
    /// No-op on an absent id.
    pub fn erase_landmark(&self, id: LandmarkId) -> Option<Landmark> {
        self.inner.lock().landmarks.remove(&id)
    }

    /// Get a point-in-time copy of a Landmark.
    pub fn landmark(&self, id: LandmarkId) -> Option<Landmark> {
        self.inner.lock().landmarks.get(&id).cloned()
    }

    /// Get an independent snapshot of all Landmark ids.
    pub fn all_landmarks(&self) -> Vec<LandmarkId> {
        self.inner.lock().landmarks.keys().copied().collect()
    }

    /// Current number of Landmarks in the map.
    pub fn landmark_count(&self) -> usize {
        self.inner.lock().landmarks.len()
    }

    /// Replace the reference-landmark working set wholesale.
    pub fn set_reference_landmarks(&self, ids: Vec<LandmarkId>) {
        self.inner.lock().reference_landmarks = ids;
    }

    /// Snapshot copy of the reference-landmark working set.
    pub fn reference_landmarks(&self) -> Vec<LandmarkId> {
        self.inner.lock().reference_landmarks.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Big-change generation
    // ─────────────────────────────────────────────────────────────────────────

    /// Signal a material change of the map topology (loop closure, global
    /// optimization). Bumps the generation counter by exactly one.
    pub fn inform_new_big_change(&self) {
        self.inner.lock().big_change_idx += 1;
    }

    /// Current big-change generation.
    ///
    /// Consumers compare this against the value they last processed to
    /// detect structural changes without walking the graph.
    pub fn last_big_change_index(&self) -> u64 {
        self.inner.lock().big_change_idx
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Landmark index
    // ─────────────────────────────────────────────────────────────────────────

    /// Assign every landmark a dense sequential index, in ascending id
    /// order, replacing any previous assignment.
    ///
    /// The assignment is deterministic for a given landmark set, but it is
    /// ephemeral: adds and erases leave it stale until the next rebuild,
    /// and it must never be persisted as a stable identifier across
    /// sessions. Read it back with [`landmark_index_of`](Self::landmark_index_of).
    pub fn rebuild_landmark_index(&self) {
        let mut inner = self.inner.lock();
        let mut ids: Vec<LandmarkId> = inner.landmarks.keys().copied().collect();
        ids.sort_unstable();
        inner.landmark_index = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i as u64))
            .collect();
    }

    /// Dense index of a landmark, as of the last rebuild.
    pub fn landmark_index_of(&self, id: LandmarkId) -> Option<u64> {
        self.inner.lock().landmark_index.get(&id).copied()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Serialization
    // ─────────────────────────────────────────────────────────────────────────

    /// Serialize the keyframe covisibility graph to a file.
    ///
    /// The graph is captured under the lock and written after releasing
    /// it, so the file holds a consistent point-in-time view while the
    /// disk I/O runs without blocking the other stages.
    ///
    /// This is a topology-only dump: landmark count, keyframe count, then
    /// one record per keyframe with its spanning-tree parent and weighted
    /// connections. Poses, descriptors and landmark positions are not
    /// written. Integers are fixed-width, host byte order; keyframe
    /// records and connection blocks are in ascending id order.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let snapshot = GraphSnapshot::capture(&self.inner.lock());

        info!(
            "Saving covisibility graph ({} keyframes, {} landmarks) to {}",
            snapshot.records.len(),
            snapshot.landmark_count,
            path.display()
        );

        let file = File::create(path)
            .with_context(|| format!("Failed to create map file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        snapshot
            .write_to(&mut writer)
            .with_context(|| format!("Failed to write map file {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush map file {}", path.display()))?;

        info!("Map save finished");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop every owned KeyFrame and Landmark and reset the map to its
    /// construction-time state.
    ///
    /// The big-change generation is deliberately left intact: consumers
    /// polling it must never see it move backwards.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let (nkf, nlm) = (inner.keyframes.len(), inner.landmarks.len());
        inner.keyframes.clear();
        inner.landmarks.clear();
        inner.reference_landmarks.clear();
        inner.keyframe_origins.clear();
        inner.landmark_index.clear();
        inner.max_keyframe_id = 0;
        debug!("Map cleared ({} keyframes, {} landmarks dropped)", nkf, nlm);
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Map")
            .field("keyframes", &inner.keyframes.len())
            .field("landmarks", &inner.landmarks.len())
            .field("max_keyframe_id", &inner.max_keyframe_id)
            .field("big_change_idx", &inner.big_change_idx)
            .finish()
    }
}

/// Owned copy of the covisibility graph, detached from the lock.
struct GraphSnapshot {
    landmark_count: u64,
    records: Vec<KeyFrameRecord>,
}

/// Per-keyframe serialization record.
struct KeyFrameRecord {
    parent: u64,
    edges: Vec<(u64, i32)>,
}

impl GraphSnapshot {
    fn capture(inner: &MapInner) -> Self {
        let mut ids: Vec<KeyFrameId> = inner.keyframes.keys().copied().collect();
        ids.sort_unstable();

        let records = ids
            .iter()
            .map(|id| {
                let kf = &inner.keyframes[id];
                let mut edges: Vec<(u64, i32)> =
                    kf.connections().map(|(cid, w)| (cid.0, w)).collect();
                edges.sort_unstable_by_key(|&(cid, _)| cid);
                KeyFrameRecord {
                    parent: kf.parent_id.map_or(NO_PARENT, |p| p.0),
                    edges,
                }
            })
            .collect();

        Self {
            landmark_count: inner.landmarks.len() as u64,
            records,
        }
    }

    fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.landmark_count.to_ne_bytes())?;
        w.write_all(&(self.records.len() as u64).to_ne_bytes())?;
        for rec in &self.records {
            w.write_all(&rec.parent.to_ne_bytes())?;
            w.write_all(&(rec.edges.len() as u64).to_ne_bytes())?;
            for &(id, weight) in &rec.edges {
                w.write_all(&id.to_ne_bytes())?;
                w.write_all(&weight.to_ne_bytes())?;
            }
        }
        Ok(())
    }
}
