//! Grid shares: how much of an aggregate a single cell receives.
//!
//! Reallocation happens in two steps. [`Allocate::resolve_grids`] looks up
//! every grid the aggregate needs in the day's [`AllocationGridSet`] and
//! fails if any is missing, before a single cell is touched.
//! [`GridLookup::retarget`] then moves the weight of positions that hold no
//! stock (land) onto the cells that do, so the shares still add up to the
//! grid's total. Finally [`Allocate::write_share`] overwrites one cell's
//! pool with `aggregate * weight(cell)`, which cannot fail and can run for
//! many cells in parallel.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::grid::Grid;
use crate::pool::{AbundancePool, BiomassPool, Pool};
use crate::series::{AllocationGridSet, GridKey};
use crate::species::{Species, SpeciesSet};

/// Grids resolved for one reallocation, indexed `[species][bin]`.
///
/// Scalar pools use a single grid per species (bin 0).
#[derive(Debug)]
pub struct GridLookup<'g> {
    offset: u32,
    grids: Vec<Vec<Resolved<'g>>>,
}

#[derive(Debug)]
struct Resolved<'g> {
    key: GridKey,
    grid: &'g Grid,
    scale: f64,
}

impl<'g> GridLookup<'g> {
    fn resolve(
        set: &'g AllocationGridSet,
        keys: Vec<Vec<GridKey>>,
    ) -> Result<Self, ConfigError> {
        let grids = keys
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|key| {
                        let grid = set.require(&key)?;
                        Ok(Resolved {
                            key,
                            grid,
                            scale: 1.0,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            offset: set.offset(),
            grids,
        })
    }

    #[inline]
    pub fn weight(&self, species: usize, bin: usize, x: usize, y: usize) -> f64 {
        let resolved = &self.grids[species][bin];
        resolved.grid.get(x, y) * resolved.scale
    }

    /// Restrict every grid to `cells`, the positions that will receive a
    /// share. Each grid is rescaled so its weight over `cells` equals its
    /// weight over the whole map; weight on other positions is spread over
    /// `cells` in proportion to their own weights.
    ///
    /// Fails with [`ConfigError::StrandedWeight`] when a grid has weight
    /// but none of it on `cells`, since that stock would have nowhere to go.
    pub fn retarget(&mut self, cells: &[(usize, usize)]) -> Result<(), ConfigError> {
        let offset = self.offset;
        let mut scales: BTreeMap<GridKey, f64> = BTreeMap::new();
        for resolved in self.grids.iter_mut().flatten() {
            let scale = match scales.get(&resolved.key) {
                Some(scale) => *scale,
                None => {
                    let scale = coverage_scale(resolved.grid, cells).ok_or_else(|| {
                        ConfigError::StrandedWeight {
                            key: resolved.key.to_string(),
                            offset,
                        }
                    })?;
                    scales.insert(resolved.key.clone(), scale);
                    scale
                }
            };
            resolved.scale = scale;
        }
        Ok(())
    }
}

/// Factor that brings the weight on `cells` up to the grid total. `None`
/// when the grid has weight but none on `cells`.
fn coverage_scale(grid: &Grid, cells: &[(usize, usize)]) -> Option<f64> {
    let total = grid.sum();
    if total <= 0.0 {
        return Some(1.0);
    }
    let covered: f64 = cells.iter().map(|(x, y)| grid.get(*x, *y)).sum();
    if covered <= 0.0 {
        return None;
    }
    if covered == total {
        Some(1.0)
    } else {
        Some(total / covered)
    }
}

/// Pools that can be spread across the map by a grid set.
pub trait Allocate: Pool {
    /// Extra information needed to pick grids (size classes for bins).
    type Classifier: Clone + Send + Sync + 'static;

    /// Find every grid this pool type needs. Missing keys are fatal.
    fn resolve_grids<'g>(
        species: &SpeciesSet,
        classifier: &Self::Classifier,
        grids: &'g AllocationGridSet,
    ) -> Result<GridLookup<'g>, ConfigError>;

    /// Overwrite `self` with the share of `aggregate` belonging to cell `(x, y)`.
    fn write_share(&mut self, aggregate: &Self, lookup: &GridLookup<'_>, x: usize, y: usize);
}

impl Allocate for BiomassPool {
    type Classifier = ();

    fn resolve_grids<'g>(
        species: &SpeciesSet,
        _classifier: &(),
        grids: &'g AllocationGridSet,
    ) -> Result<GridLookup<'g>, ConfigError> {
        let keys = species
            .iter()
            .map(|s| vec![GridKey::species(&s.name)])
            .collect();
        GridLookup::resolve(grids, keys)
    }

    fn write_share(&mut self, aggregate: &Self, lookup: &GridLookup<'_>, x: usize, y: usize) {
        for species in 0..aggregate.values().len() {
            self.set(species, aggregate.get(species) * lookup.weight(species, 0, x, y));
        }
    }
}

/// Maps a (species, bin) pair to the size class whose grid governs it.
pub trait BinClassifier: Send + Sync {
    fn size_class(&self, species: &Species, bin: usize) -> String;
}

impl<F> BinClassifier for F
where
    F: Fn(&Species, usize) -> String + Send + Sync,
{
    fn size_class(&self, species: &Species, bin: usize) -> String {
        self(species, bin)
    }
}

/// Classifies bins by mean length: below the threshold is `small`, at or
/// above it is `large`.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthThreshold {
    pub threshold_cm: f64,
    pub small: String,
    pub large: String,
}

impl LengthThreshold {
    pub fn new(threshold_cm: f64) -> Self {
        Self {
            threshold_cm,
            small: "small".to_string(),
            large: "large".to_string(),
        }
    }
}

impl BinClassifier for LengthThreshold {
    fn size_class(&self, species: &Species, bin: usize) -> String {
        if species.mean_length(bin) < self.threshold_cm {
            self.small.clone()
        } else {
            self.large.clone()
        }
    }
}

impl Allocate for AbundancePool {
    type Classifier = Arc<dyn BinClassifier>;

    fn resolve_grids<'g>(
        species: &SpeciesSet,
        classifier: &Self::Classifier,
        grids: &'g AllocationGridSet,
    ) -> Result<GridLookup<'g>, ConfigError> {
        let keys = species
            .iter()
            .map(|s| {
                (0..s.bin_count())
                    .map(|bin| GridKey::sized(&s.name, classifier.size_class(s, bin)))
                    .collect()
            })
            .collect();
        GridLookup::resolve(grids, keys)
    }

    fn write_share(&mut self, aggregate: &Self, lookup: &GridLookup<'_>, x: usize, y: usize) {
        for (species, total) in aggregate.matrices().iter().enumerate() {
            let cell = self.matrix_mut(species);
            for sub in 0..total.subdivisions() {
                for bin in 0..total.bins() {
                    cell.set(sub, bin, total.get(sub, bin) * lookup.weight(species, bin, x, y));
                }
            }
        }
    }
}
