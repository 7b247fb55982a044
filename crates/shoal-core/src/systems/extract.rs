//! Extractor: read pools of one representation out of the world.

use hecs::World;
use shoal_logic::aggregate::aggregate;
use shoal_logic::{Pool, SpeciesSet};

use crate::components::{Fad, SpatialCell};

/// Which holders of stock to read from.
///
/// Only entities carrying a pool of the requested type are returned, so
/// cells with `EmptyBiology` (or the other pool representation) are
/// filtered out by the query itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extractor {
    pub include_fixed: bool,
    pub include_mobile: bool,
}

impl Extractor {
    pub const fn new(include_fixed: bool, include_mobile: bool) -> Self {
        Self {
            include_fixed,
            include_mobile,
        }
    }

    pub const fn fixed_only() -> Self {
        Self::new(true, false)
    }

    pub const fn mobile_only() -> Self {
        Self::new(false, true)
    }

    pub const fn all() -> Self {
        Self::new(true, true)
    }

    /// Clone every matching pool.
    pub fn extract<P: Pool>(&self, world: &World) -> Vec<P> {
        let mut pools = Vec::new();
        if self.include_fixed {
            pools.extend(
                world
                    .query::<(&SpatialCell, &P)>()
                    .iter()
                    .map(|(_, (_, pool))| pool.clone()),
            );
        }
        if self.include_mobile {
            pools.extend(
                world
                    .query::<(&Fad, &P)>()
                    .iter()
                    .map(|(_, (_, pool))| pool.clone()),
            );
        }
        pools
    }

    /// Sum every matching pool without cloning them first.
    pub fn aggregate<P: Pool>(&self, world: &World, species: &SpeciesSet) -> P {
        let mut total = P::zeroed(species);
        if self.include_fixed {
            let mut query = world.query::<(&SpatialCell, &P)>();
            total.accumulate(&aggregate(species, query.iter().map(|(_, (_, pool))| pool)));
        }
        if self.include_mobile {
            let mut query = world.query::<(&Fad, &P)>();
            total.accumulate(&aggregate(species, query.iter().map(|(_, (_, pool))| pool)));
        }
        total
    }

    /// Number of matching holders.
    pub fn count<P: Pool>(&self, world: &World) -> usize {
        let fixed = if self.include_fixed {
            world.query::<(&SpatialCell, &P)>().iter().count()
        } else {
            0
        };
        let mobile = if self.include_mobile {
            world.query::<(&Fad, &P)>().iter().count()
        } else {
            0
        };
        fixed + mobile
    }
}
