//! Spatial hash grid over agent transforms.

use glam::Vec3;
use rayon::prelude::*;
use shoal_core::Transform;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Quantized cell coordinate: floor-division of each position axis by the
/// cell size.
pub type CellKey = (i32, i32, i32);

type Bucket = SmallVec<[Transform; 4]>;

/// Agents handed to one shard of the parallel rebuild.
const REBUILD_BATCH: usize = 64;

/// Multi-map from cell coordinate to the agents currently inside that cell.
///
/// Fully rebuilt every tick; there is no incremental insert/remove, which
/// keeps the structure free of stale-entry invariants. Keys with zero
/// occupants simply do not exist in the map.
#[derive(Debug)]
pub struct SpatialHashGrid {
    cell_size: f32,
    buckets: HashMap<CellKey, Bucket>,
}

fn key_for(cell_size: f32, position: Vec3) -> CellKey {
    (
        (position.x / cell_size).floor() as i32,
        (position.y / cell_size).floor() as i32,
        (position.z / cell_size).floor() as i32,
    )
}

impl SpatialHashGrid {
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0);
        Self {
            cell_size,
            buckets: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell coordinate a position maps to.
    pub fn cell_key(&self, position: Vec3) -> CellKey {
        key_for(self.cell_size, position)
    }

    /// Clear and re-insert every agent.
    ///
    /// Each agent's insert is independent, so the build is sharded across
    /// rayon workers and the shard maps merged afterwards. Insertion cannot
    /// fail; buckets grow on demand.
    pub fn rebuild(&mut self, agents: &[Transform]) {
        let cell_size = self.cell_size;
        self.buckets = agents
            .par_chunks(REBUILD_BATCH)
            .map(|chunk| {
                let mut shard: HashMap<CellKey, Bucket> = HashMap::new();
                for transform in chunk {
                    shard
                        .entry(key_for(cell_size, transform.position))
                        .or_default()
                        .push(*transform);
                }
                shard
            })
            .reduce(HashMap::new, |mut merged, shard| {
                for (key, mut bucket) in shard {
                    merged.entry(key).or_default().append(&mut bucket);
                }
                merged
            });
    }

    /// Agents occupying one cell, if any.
    pub fn bucket(&self, key: CellKey) -> Option<&[Transform]> {
        self.buckets.get(&key).map(|bucket| bucket.as_slice())
    }

    /// Number of cells with at least one occupant.
    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of bucketed agents across all cells.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
