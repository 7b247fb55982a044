//! Reallocator: overwrite every fixed cell's pool with its grid share of an
//! aggregate.
//!
//! All grids are resolved and restricted to the cells that hold a pool
//! before the first write, so a missing grid or a grid with no weight on
//! any such cell aborts with the world untouched. Weight that falls on land
//! is spread over the water cells, so the cells receive the whole
//! aggregate. The per-cell writes are independent and run on the rayon
//! pool.

use std::sync::Arc;

use hecs::World;
use rayon::prelude::*;
use shoal_logic::allocate::Allocate;
use shoal_logic::cache::{shared_grid_series, GridSeriesKey};
use shoal_logic::series::GridTimeSeries;
use shoal_logic::{ConfigError, SpeciesSet};

use crate::components::SpatialCell;

/// Spreads an aggregate pool over the map using a grid time series.
pub struct Reallocator<P: Allocate> {
    grids: Arc<GridTimeSeries>,
    classifier: P::Classifier,
}

impl<P: Allocate> Reallocator<P> {
    pub fn new(grids: Arc<GridTimeSeries>, classifier: P::Classifier) -> Self {
        Self { grids, classifier }
    }

    /// Build on a grid series loaded through the shared cache, so runs with
    /// the same grid configuration share one copy.
    pub fn cached(key: &GridSeriesKey, classifier: P::Classifier) -> Result<Self, ConfigError> {
        Ok(Self::new(shared_grid_series(key)?, classifier))
    }

    /// The grid series this reallocator reads.
    pub fn allocation_grids(&self) -> &Arc<GridTimeSeries> {
        &self.grids
    }

    pub fn classifier(&self) -> &P::Classifier {
        &self.classifier
    }

    /// Overwrite every `(SpatialCell, P)` entity with its share of
    /// `aggregate` under the grid set active at `step`.
    pub fn reallocate(
        &self,
        world: &mut World,
        species: &SpeciesSet,
        step: u32,
        aggregate: &P,
    ) -> Result<(), ConfigError> {
        let set = self.grids.at_or_before_step(step);
        let mut lookup = P::resolve_grids(species, &self.classifier, set)?;

        let mut targets: Vec<(&SpatialCell, &mut P)> = world
            .query_mut::<(&SpatialCell, &mut P)>()
            .into_iter()
            .map(|(_, target)| target)
            .collect();
        let cells: Vec<(usize, usize)> = targets.iter().map(|(cell, _)| (cell.x, cell.y)).collect();
        lookup.retarget(&cells)?;
        targets
            .par_iter_mut()
            .for_each(|(cell, pool)| pool.write_share(aggregate, &lookup, cell.x, cell.y));

        log::debug!(
            "reallocated day {} over {} cells with grids from offset {}",
            step,
            targets.len(),
            set.offset()
        );
        Ok(())
    }
}

impl<P: Allocate> Clone for Reallocator<P> {
    fn clone(&self) -> Self {
        Self {
            grids: Arc::clone(&self.grids),
            classifier: self.classifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::components::{EmptyBiology, Fad};
    use shoal_logic::grid::Grid;
    use shoal_logic::series::{AllocationGridSet, GridKey};
    use shoal_logic::{BiomassPool, Pool, Species};

    fn grids(weights: &[(usize, f64)], second_key: bool) -> Arc<GridTimeSeries> {
        let mut grid = Grid::new(3, 1);
        for (x, w) in weights {
            grid.set(*x, 0, *w);
        }
        let mut map = BTreeMap::from([(GridKey::species("A"), grid.clone())]);
        if second_key {
            map.insert(GridKey::species("B"), grid);
        }
        Arc::new(GridTimeSeries::from_sets([AllocationGridSet::new(0, map)], 365).unwrap())
    }

    #[test]
    fn test_fixed_cells_overwritten_mobile_untouched() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let mut world = World::new();
        let a = world.spawn((SpatialCell::new(0, 0), BiomassPool::new(vec![1.0])));
        let b = world.spawn((SpatialCell::new(1, 0), BiomassPool::new(vec![2.0])));
        let land = world.spawn((SpatialCell::new(2, 0), EmptyBiology));
        let fad = world.spawn((Fad { id: 1 }, BiomassPool::new(vec![9.0])));

        let reallocator = Reallocator::<BiomassPool>::new(grids(&[(0, 0.25), (1, 0.75)], false), ());
        reallocator
            .reallocate(&mut world, &species, 40, &BiomassPool::new(vec![40.0]))
            .unwrap();

        assert_eq!(world.get::<&BiomassPool>(a).unwrap().get(0), 10.0);
        assert_eq!(world.get::<&BiomassPool>(b).unwrap().get(0), 30.0);
        assert_eq!(world.get::<&BiomassPool>(fad).unwrap().get(0), 9.0);
        assert!(world.get::<&BiomassPool>(land).is_err());
    }

    #[test]
    fn test_missing_grid_leaves_world_untouched() {
        let species = SpeciesSet::new(vec![Species::biomass("A"), Species::biomass("B")]);
        let mut world = World::new();
        let a = world.spawn((SpatialCell::new(0, 0), BiomassPool::new(vec![1.0, 1.0])));

        let reallocator = Reallocator::<BiomassPool>::new(grids(&[(0, 1.0)], false), ());
        let err = reallocator
            .reallocate(&mut world, &species, 0, &BiomassPool::zeroed(&species))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingGrid { .. }));
        assert_eq!(world.get::<&BiomassPool>(a).unwrap().values(), &[1.0, 1.0]);
    }

    fn diagonal() -> Arc<GridTimeSeries> {
        let mut grid = Grid::new(2, 2);
        grid.set(0, 0, 0.5);
        grid.set(1, 1, 0.5);
        let map = BTreeMap::from([(GridKey::species("A"), grid)]);
        Arc::new(GridTimeSeries::from_sets([AllocationGridSet::new(0, map)], 365).unwrap())
    }

    #[test]
    fn test_weight_on_land_goes_to_water() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let mut world = World::new();
        let nw = world.spawn((SpatialCell::new(0, 0), BiomassPool::zeroed(&species)));
        world.spawn((SpatialCell::new(1, 0), BiomassPool::zeroed(&species)));
        world.spawn((SpatialCell::new(0, 1), BiomassPool::zeroed(&species)));
        world.spawn((SpatialCell::new(1, 1), EmptyBiology));

        let reallocator = Reallocator::<BiomassPool>::new(diagonal(), ());
        reallocator
            .reallocate(&mut world, &species, 0, &BiomassPool::new(vec![100.0]))
            .unwrap();

        let fixed: f64 = world
            .query::<(&SpatialCell, &BiomassPool)>()
            .iter()
            .map(|(_, (_, pool))| pool.get(0))
            .sum();
        assert!((fixed - 100.0).abs() < 1e-9);
        assert_eq!(world.get::<&BiomassPool>(nw).unwrap().get(0), 100.0);
    }

    #[test]
    fn test_grid_only_on_land_leaves_world_untouched() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let mut world = World::new();
        let ne = world.spawn((SpatialCell::new(1, 0), BiomassPool::new(vec![3.0])));
        world.spawn((SpatialCell::new(0, 0), EmptyBiology));
        world.spawn((SpatialCell::new(1, 1), EmptyBiology));

        let reallocator = Reallocator::<BiomassPool>::new(diagonal(), ());
        let err = reallocator
            .reallocate(&mut world, &species, 0, &BiomassPool::new(vec![100.0]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::StrandedWeight { offset: 0, .. }));
        assert_eq!(world.get::<&BiomassPool>(ne).unwrap().get(0), 3.0);
    }

    #[test]
    fn test_allocation_grids_accessor() {
        let series = grids(&[(0, 1.0)], true);
        let reallocator = Reallocator::<BiomassPool>::new(Arc::clone(&series), ());
        assert!(Arc::ptr_eq(reallocator.allocation_grids(), &series));
        assert!(Arc::ptr_eq(reallocator.clone().allocation_grids(), &series));
    }
}
