//! World setup: map cells, initial stock, and mobile devices.

use hecs::{Entity, World};
use shoal_logic::allocate::Allocate;
use shoal_logic::extent::MapExtent;
use shoal_logic::{ConfigError, Pool, SpeciesSet};

use crate::components::{EmptyBiology, Fad, SpatialCell};
use crate::systems::Reallocator;

/// Spawn one entity per map cell. Water cells get an empty `P` pool, land
/// cells get [`EmptyBiology`] and are never written by reallocation; grid
/// weight on them is spread over the water cells instead.
pub fn spawn_cells<P: Pool>(
    world: &mut World,
    extent: &MapExtent,
    species: &SpeciesSet,
    is_water: impl Fn(usize, usize) -> bool,
) -> Vec<Entity> {
    let mut cells = Vec::with_capacity(extent.cell_count());
    let mut land = 0usize;
    for y in 0..extent.height {
        for x in 0..extent.width {
            let cell = SpatialCell::new(x, y);
            let entity = if is_water(x, y) {
                world.spawn((cell, P::zeroed(species)))
            } else {
                land += 1;
                world.spawn((cell, EmptyBiology))
            };
            cells.push(entity);
        }
    }
    log::info!(
        "spawned {} map cells ({} land) on a {}x{} grid",
        cells.len(),
        land,
        extent.width,
        extent.height
    );
    cells
}

/// Distribute an initial stock over the water cells with the offset-0 grids.
pub fn seed_stock<P: Allocate>(
    world: &mut World,
    species: &SpeciesSet,
    reallocator: &Reallocator<P>,
    initial: &P,
) -> Result<(), ConfigError> {
    reallocator.reallocate(world, species, 0, initial)
}

/// Spawn a mobile device holding its own pool.
pub fn spawn_fad<P: Pool>(world: &mut World, id: u32, pool: P) -> Entity {
    world.spawn((Fad { id }, pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::Extractor;
    use shoal_logic::{BiomassPool, Species};

    #[test]
    fn test_land_cells_hold_no_pool() {
        let species = SpeciesSet::new(vec![Species::biomass("A")]);
        let extent = MapExtent::new(0.0, 3.0, 0.0, 2.0, 3, 2);
        let mut world = World::new();
        // Column 0 is land.
        let cells = spawn_cells::<BiomassPool>(&mut world, &extent, &species, |x, _| x > 0);
        assert_eq!(cells.len(), 6);
        assert_eq!(Extractor::fixed_only().count::<BiomassPool>(&world), 4);
        assert_eq!(world.query::<&EmptyBiology>().iter().count(), 2);
    }

    #[test]
    fn test_spawn_fad() {
        let mut world = World::new();
        let fad = spawn_fad(&mut world, 12, BiomassPool::new(vec![3.0]));
        assert_eq!(world.get::<&Fad>(fad).unwrap().id, 12);
        assert_eq!(Extractor::mobile_only().count::<BiomassPool>(&world), 1);
    }
}
