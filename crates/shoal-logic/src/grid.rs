//! Rectangular weight grids covering the map extent.

use serde::{Deserialize, Serialize};

/// Per-cell non-negative weights, row-major (`y * width + x`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<f64>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Weight at a cell; zero outside the grid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            0.0
        }
    }

    /// Overwrite a cell. Negative values are stored as zero; out-of-range
    /// cells are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = value.max(0.0);
        }
    }

    pub fn sum(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Rescale so the weights sum to one. Returns `false` (and leaves the
    /// grid untouched) when the grid has nothing to rescale.
    pub fn normalize(&mut self) -> bool {
        let total = self.sum();
        if !(total.is_finite() && total > 0.0) {
            return false;
        }
        for cell in &mut self.cells {
            *cell /= total;
        }
        true
    }
}
