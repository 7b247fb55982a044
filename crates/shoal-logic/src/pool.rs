//! Stock pools: the biology attached to a cell or a mobile object.
//!
//! Two representations share one protocol:
//! - [`BiomassPool`]: one non-negative value per species.
//! - [`AbundancePool`]: per species, a `[subdivision][bin]` count matrix.
//!
//! Every value must stay finite and `>= 0`. Subtraction floors at zero
//! instead of going negative.

use serde::{Deserialize, Serialize};

use crate::species::SpeciesSet;

/// Operations every stock representation supports.
pub trait Pool: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// A pool with every value at zero for the given species set.
    fn zeroed(species: &SpeciesSet) -> Self;

    /// Add `other` element-wise into `self`.
    fn accumulate(&mut self, other: &Self);

    /// Element-wise `max(0, self - other)`.
    fn subtract_floored(&mut self, other: &Self);

    /// Total stock held for a species (biomass, or fish count).
    fn species_total(&self, species: usize) -> f64;

    /// True when every value is finite and non-negative.
    fn is_physical(&self) -> bool;
}

/// Scalar representation: a biomass value per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomassPool {
    biomass: Vec<f64>,
}

impl BiomassPool {
    pub fn new(biomass: Vec<f64>) -> Self {
        Self { biomass }
    }

    pub fn get(&self, species: usize) -> f64 {
        self.biomass.get(species).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, species: usize, value: f64) {
        if let Some(slot) = self.biomass.get_mut(species) {
            *slot = value.max(0.0);
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.biomass
    }
}

impl Pool for BiomassPool {
    fn zeroed(species: &SpeciesSet) -> Self {
        Self {
            biomass: vec![0.0; species.len()],
        }
    }

    fn accumulate(&mut self, other: &Self) {
        debug_assert_eq!(self.biomass.len(), other.biomass.len());
        for (a, b) in self.biomass.iter_mut().zip(&other.biomass) {
            *a += b;
        }
    }

    fn subtract_floored(&mut self, other: &Self) {
        debug_assert_eq!(self.biomass.len(), other.biomass.len());
        for (a, b) in self.biomass.iter_mut().zip(&other.biomass) {
            *a = (*a - b).max(0.0);
        }
    }

    fn species_total(&self, species: usize) -> f64 {
        self.get(species)
    }

    fn is_physical(&self) -> bool {
        self.biomass.iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Fish counts for one species, indexed `[subdivision][bin]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundanceMatrix {
    subdivisions: usize,
    bins: usize,
    /// Row-major: `subdivision * bins + bin`.
    counts: Vec<f64>,
}

impl AbundanceMatrix {
    pub fn zeros(subdivisions: usize, bins: usize) -> Self {
        Self {
            subdivisions,
            bins,
            counts: vec![0.0; subdivisions * bins],
        }
    }

    /// Build from explicit rows. Rows must share one length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let subdivisions = rows.len();
        let bins = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == bins));
        Self {
            subdivisions,
            bins,
            counts: rows.into_iter().flatten().collect(),
        }
    }

    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    #[inline]
    pub fn get(&self, subdivision: usize, bin: usize) -> f64 {
        self.counts[subdivision * self.bins + bin]
    }

    #[inline]
    pub fn set(&mut self, subdivision: usize, bin: usize, value: f64) {
        self.counts[subdivision * self.bins + bin] = value.max(0.0);
    }

    pub fn row(&self, subdivision: usize) -> &[f64] {
        let start = subdivision * self.bins;
        &self.counts[start..start + self.bins]
    }

    pub fn row_mut(&mut self, subdivision: usize) -> &mut [f64] {
        let start = subdivision * self.bins;
        &mut self.counts[start..start + self.bins]
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    fn accumulate(&mut self, other: &Self) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
    }

    fn subtract_floored(&mut self, other: &Self) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a = (*a - b).max(0.0);
        }
    }
}

/// Structured representation: one count matrix per species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbundancePool {
    matrices: Vec<AbundanceMatrix>,
}

impl AbundancePool {
    pub fn new(matrices: Vec<AbundanceMatrix>) -> Self {
        Self { matrices }
    }

    pub fn matrix(&self, species: usize) -> &AbundanceMatrix {
        &self.matrices[species]
    }

    pub fn matrix_mut(&mut self, species: usize) -> &mut AbundanceMatrix {
        &mut self.matrices[species]
    }

    pub fn matrices(&self) -> &[AbundanceMatrix] {
        &self.matrices
    }

    /// Biomass in kg for a species, using its per-bin weights.
    pub fn biomass(&self, species: &SpeciesSet, idx: usize) -> f64 {
        let (Some(meta), Some(matrix)) = (species.get(idx), self.matrices.get(idx)) else {
            return 0.0;
        };
        (0..matrix.subdivisions())
            .flat_map(|sub| (0..matrix.bins()).map(move |bin| (sub, bin)))
            .map(|(sub, bin)| matrix.get(sub, bin) * meta.weights[sub][bin])
            .sum()
    }
}

impl Pool for AbundancePool {
    fn zeroed(species: &SpeciesSet) -> Self {
        Self {
            matrices: species
                .iter()
                .map(|s| AbundanceMatrix::zeros(s.subdivision_count(), s.bin_count()))
                .collect(),
        }
    }

    fn accumulate(&mut self, other: &Self) {
        for (a, b) in self.matrices.iter_mut().zip(&other.matrices) {
            a.accumulate(b);
        }
    }

    fn subtract_floored(&mut self, other: &Self) {
        for (a, b) in self.matrices.iter_mut().zip(&other.matrices) {
            a.subtract_floored(b);
        }
    }

    fn species_total(&self, species: usize) -> f64 {
        self.matrices.get(species).map_or(0.0, AbundanceMatrix::total)
    }

    fn is_physical(&self) -> bool {
        self.matrices
            .iter()
            .flat_map(|m| m.counts.iter())
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}
