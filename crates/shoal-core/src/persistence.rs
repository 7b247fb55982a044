//! Save/Load of simulation state
//!
//! Uses bincode for a compact binary snapshot of the day counter, the
//! species list and every cell and device with its pool. Components are
//! serialized individually then reconstructed on load. Schedules and grid
//! series are configuration and are rebuilt by the caller, not saved.

use hecs::World;
use serde::{Deserialize, Serialize};
use shoal_logic::{AbundancePool, BiomassPool, SpeciesSet};
use std::io::{Read, Write};
use thiserror::Error;

use crate::components::*;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Last simulated day
    pub day: u32,
    /// Seed the engine's random source was built from
    pub seed: u64,
    pub species: SpeciesSet,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    // Holders
    pub cell: Option<SpatialCell>,
    pub fad: Option<Fad>,

    // Biology
    pub biomass: Option<BiomassPool>,
    pub abundance: Option<AbundancePool>,
    pub empty: Option<EmptyBiology>,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World) -> Vec<SerializableEntity> {
    world
        .iter()
        .map(|entity_ref| SerializableEntity {
            cell: entity_ref.get::<&SpatialCell>().map(|c| *c),
            fad: entity_ref.get::<&Fad>().map(|c| *c),
            biomass: entity_ref.get::<&BiomassPool>().map(|c| (*c).clone()),
            abundance: entity_ref.get::<&AbundancePool>().map(|c| (*c).clone()),
            empty: entity_ref.get::<&EmptyBiology>().map(|c| *c),
        })
        .collect()
}

/// Spawn an entity with all its components
fn spawn_entity(world: &mut World, se: SerializableEntity) {
    let mut builder = hecs::EntityBuilder::new();
    if let Some(c) = se.cell {
        builder.add(c);
    }
    if let Some(c) = se.fad {
        builder.add(c);
    }
    if let Some(c) = se.biomass {
        builder.add(c);
    }
    if let Some(c) = se.abundance {
        builder.add(c);
    }
    if let Some(c) = se.empty {
        builder.add(c);
    }
    world.spawn(builder.build());
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(
    writer: W,
    world: &World,
    day: u32,
    seed: u64,
    species: &SpeciesSet,
) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        day,
        seed,
        species: species.clone(),
        entities: serialize_entities(world),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    for se in save_data.entities {
        spawn_entity(&mut world, se);
    }

    Ok(LoadedSimulation {
        world,
        day: save_data.day,
        seed: save_data.seed,
        species: save_data.species,
    })
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub world: World,
    pub day: u32,
    pub seed: u64,
    pub species: SpeciesSet,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot bytes are truncated or not a snapshot at all.
    #[error("snapshot encoding failed: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("snapshot format version {found} is not supported (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },
}
