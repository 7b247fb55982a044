//! Map components: fixed cells and mobile aggregating devices.

use serde::{Deserialize, Serialize};

/// A fixed map cell. Long-lived; created once at world setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialCell {
    pub x: usize,
    pub y: usize,
}

impl SpatialCell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A fish aggregating device: a mobile object holding its own stock pool.
/// Spawned and despawned by whatever drifts and fishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fad {
    pub id: u32,
}

/// Placeholder biology for cells that hold no stock (land).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyBiology;
