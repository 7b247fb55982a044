//! Restorer: periodically pull the map back onto its reference grids.

use std::sync::Arc;

use hecs::World;
use shoal_logic::allocate::Allocate;
use shoal_logic::exclude::exclude;
use shoal_logic::{ConfigError, SpeciesSet};

use super::extract::Extractor;
use super::reallocate::Reallocator;

/// Aggregates the stock, removes what mobile devices hold, and
/// reallocates the rest over the fixed cells.
///
/// The source extractor reads fixed cells and mobile devices by default, so
/// the exclusion leaves exactly the stock outside mobile objects.
pub struct Restorer<P: Allocate> {
    reallocator: Arc<Reallocator<P>>,
    source: Extractor,
    mobile: Extractor,
}

impl<P: Allocate> Restorer<P> {
    pub fn new(reallocator: Arc<Reallocator<P>>) -> Self {
        Self {
            reallocator,
            source: Extractor::all(),
            mobile: Extractor::mobile_only(),
        }
    }

    /// Override which holders feed the aggregate.
    pub fn with_source(mut self, source: Extractor) -> Self {
        self.source = source;
        self
    }

    pub fn reallocator(&self) -> &Arc<Reallocator<P>> {
        &self.reallocator
    }

    pub fn restore(
        &self,
        world: &mut World,
        species: &SpeciesSet,
        step: u32,
    ) -> Result<(), ConfigError> {
        let total: P = self.source.aggregate(world, species);
        let mobile: P = self.mobile.aggregate(world, species);
        let outside_mobile = exclude(&total, &mobile);
        self.reallocator
            .reallocate(world, species, step, &outside_mobile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::components::{Fad, SpatialCell};
    use shoal_logic::grid::Grid;
    use shoal_logic::series::{AllocationGridSet, GridKey, GridTimeSeries};
    use shoal_logic::{BiomassPool, Pool, Species};

    fn restorer() -> Restorer<BiomassPool> {
        let mut grid = Grid::new(2, 1);
        grid.set(0, 0, 0.5);
        grid.set(1, 0, 0.5);
        let series = GridTimeSeries::from_sets(
            [AllocationGridSet::new(0, BTreeMap::from([(GridKey::species("A"), grid)]))],
            365,
        )
        .unwrap();
        Restorer::new(Arc::new(Reallocator::new(Arc::new(series), ())))
    }

    #[test]
    fn test_restore_evens_out_drift_and_keeps_mobile_stock() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let mut world = World::new();
        let west = world.spawn((SpatialCell::new(0, 0), BiomassPool::new(vec![90.0])));
        let east = world.spawn((SpatialCell::new(1, 0), BiomassPool::new(vec![10.0])));
        let fad = world.spawn((Fad { id: 1 }, BiomassPool::new(vec![25.0])));

        restorer().restore(&mut world, &species, 3).unwrap();

        assert_eq!(world.get::<&BiomassPool>(west).unwrap().get(0), 50.0);
        assert_eq!(world.get::<&BiomassPool>(east).unwrap().get(0), 50.0);
        assert_eq!(world.get::<&BiomassPool>(fad).unwrap().get(0), 25.0);

        let fixed: BiomassPool = Extractor::fixed_only().aggregate(&world, &species);
        assert_eq!(fixed.get(0), 100.0);
    }

    #[test]
    fn test_restore_without_mobile_objects() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let mut world = World::new();
        world.spawn((SpatialCell::new(0, 0), BiomassPool::new(vec![4.0])));
        world.spawn((SpatialCell::new(1, 0), BiomassPool::zeroed(&species)));

        restorer().restore(&mut world, &species, 0).unwrap();
        let cells = Extractor::fixed_only().extract::<BiomassPool>(&world);
        assert!(cells.iter().all(|c| c.get(0) == 2.0));
    }
}
