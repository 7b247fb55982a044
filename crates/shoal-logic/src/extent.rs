//! Map extent: the bounding box of the simulated area and its grid size.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Geographic bounds of the map plus its cell resolution.
///
/// Cell `(0, 0)` is the north-west corner; `x` grows east and `y` grows
/// south. West and north edges are inclusive, east and south exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapExtent {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    pub width: usize,
    pub height: usize,
}

impl MapExtent {
    pub fn new(west: f64, east: f64, south: f64, north: f64, width: usize, height: usize) -> Self {
        Self {
            west,
            east,
            south,
            north,
            width,
            height,
        }
    }

    pub fn cell_width(&self) -> f64 {
        (self.east - self.west) / self.width as f64
    }

    pub fn cell_height(&self) -> f64 {
        (self.north - self.south) / self.height as f64
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Project a coordinate onto a cell. `None` when it falls outside.
    pub fn cell_of(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let gx = ((lon - self.west) / self.cell_width()).floor();
        let gy = ((self.north - lat) / self.cell_height()).floor();
        if gx < 0.0 || gy < 0.0 {
            return None;
        }
        let (x, y) = (gx as usize, gy as usize);
        (x < self.width && y < self.height).then_some((x, y))
    }
}

// Extents are used as cache keys; compare by bit pattern.
impl Eq for MapExtent {}

impl Hash for MapExtent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.west.to_bits().hash(state);
        self.east.to_bits().hash(state);
        self.south.to_bits().hash(state);
        self.north.to_bits().hash(state);
        self.width.hash(state);
        self.height.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent() -> MapExtent {
        MapExtent::new(-150.0, -70.0, -50.0, 50.0, 80, 100)
    }

    #[test]
    fn test_cell_of_corners() {
        let e = extent();
        assert_eq!(e.cell_of(-150.0, 50.0), Some((0, 0)));
        assert_eq!(e.cell_of(-70.5, -49.5), Some((79, 99)));
    }

    #[test]
    fn test_cell_of_outside_is_none() {
        let e = extent();
        assert_eq!(e.cell_of(-151.0, 0.0), None);
        assert_eq!(e.cell_of(-70.0, 0.0), None); // east edge is exclusive
        assert_eq!(e.cell_of(-100.0, 51.0), None);
        assert_eq!(e.cell_of(f64::NAN, 0.0), None);
    }
}
