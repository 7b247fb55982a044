//! Shoal Core - Spatial Fish Stock Simulation Engine
//!
//! An ECS-based simulation of fish stocks spread over a map grid. Every
//! water cell holds a pool of fish; mobile aggregating devices hold their
//! own. On scheduled days the stock is gathered, run through biology, and
//! spread back over the cells according to dated weight grids.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Map cells and fish aggregating devices (FADs)
//! - **Components**: Holders ([`SpatialCell`](components::SpatialCell),
//!   [`Fad`](components::Fad)) plus a pool from `shoal_logic`
//! - **Systems**: Extraction, reallocation, restoration, and the daily
//!   process schedules that chain them
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shoal_core::prelude::*;
//! use shoal_logic::config::GridSeriesConfig;
//! use shoal_logic::extent::MapExtent;
//! use shoal_logic::{BiomassPool, Species, SpeciesSet};
//!
//! let species = SpeciesSet::new(vec![Species::biomass("skipjack")]);
//! let extent = MapExtent::new(140.0, 160.0, -10.0, 10.0, 20, 20);
//! let config = GridSeriesConfig::new("grids.csv", extent);
//! let reallocator = Arc::new(Reallocator::<BiomassPool>::cached(&config.key(), ()).unwrap());
//!
//! let mut engine = SimulationEngine::new(species.clone(), 42);
//! spawn_cells::<BiomassPool>(&mut engine.world, &extent, &species, |_, _| true);
//! engine.register(Arc::new(restoration_schedule(reallocator, None).unwrap()));
//! engine.run(365).unwrap();
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`components`] | Map cell, FAD, and empty-biology markers |
//! | [`engine`] | `SimulationEngine`: day loop, observers, save/load |
//! | [`error`] | `SimulationError` raised while running |
//! | [`observer`] | Death events and their subscribers |
//! | [`persistence`] | Binary snapshots of the world |
//! | [`seeding`] | Spawning cells and devices, initial stock |
//! | [`systems`] | Extract, reallocate, restore, stages, schedules |

pub mod components;
pub mod engine;
pub mod error;
pub mod observer;
pub mod persistence;
pub mod seeding;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::SimulationEngine;
    pub use crate::error::SimulationError;
    pub use crate::observer::{DeathEvent, DeathObserver, DeathTally};
    pub use crate::seeding::{seed_stock, spawn_cells, spawn_fad};
    pub use crate::systems::*;
}
