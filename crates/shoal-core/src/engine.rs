//! Simulation engine - main entry point for running the simulation

use std::sync::Arc;

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shoal_logic::{Pool, SpeciesSet};

use crate::components::*;
use crate::error::SimulationError;
use crate::observer::{DeathObserver, DeathObservers};
use crate::systems::{DailyStep, Extractor, ProcessContext};

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing cells and mobile devices
    pub world: World,
    /// Species shared by every pool in the world
    species: Arc<SpeciesSet>,
    /// Last simulated day (0 until the first step)
    day: u32,
    seed: u64,
    rng: StdRng,
    /// Registered daily processes, run in registration order
    daily: Vec<Arc<dyn DailyStep>>,
    observers: DeathObservers,
    started: bool,
}

impl SimulationEngine {
    /// Create an empty simulation
    pub fn new(species: SpeciesSet, seed: u64) -> Self {
        Self {
            world: World::new(),
            species: Arc::new(species),
            day: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
            daily: Vec::new(),
            observers: DeathObservers::new(),
            started: false,
        }
    }

    /// Add a process to run every day, after those already registered
    pub fn register(&mut self, step: Arc<dyn DailyStep>) {
        self.daily.push(step);
    }

    /// Receive death events from mortality stages
    pub fn subscribe(&mut self, observer: Box<dyn DeathObserver>) {
        self.observers.subscribe(observer);
    }

    /// Call `start` on every registered process. Runs automatically
    /// before the first step if not called.
    pub fn start(&mut self) -> Result<(), SimulationError> {
        for step in &self.daily {
            step.start(&mut self.world, &self.species)?;
        }
        self.started = true;
        log::info!(
            "simulation started: {} species, {} daily processes, {} entities",
            self.species.len(),
            self.daily.len(),
            self.world.len()
        );
        Ok(())
    }

    /// Advance one day and run every registered process on it
    pub fn step(&mut self) -> Result<(), SimulationError> {
        if !self.started {
            self.start()?;
        }
        self.day += 1;
        let mut ctx = ProcessContext {
            world: &mut self.world,
            species: &self.species,
            day: self.day,
            rng: &mut self.rng,
            deaths: &mut self.observers,
        };
        for step in &self.daily {
            step.step(&mut ctx)?;
        }
        Ok(())
    }

    /// Run `days` consecutive steps, stopping at the first error
    pub fn run(&mut self, days: u32) -> Result<(), SimulationError> {
        for _ in 0..days {
            self.step()?;
        }
        Ok(())
    }

    /// Get the last simulated day
    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn species(&self) -> &Arc<SpeciesSet> {
        &self.species
    }

    /// Total stock of one species held by the selected holders
    pub fn stock<P: Pool>(&self, species: usize, holders: Extractor) -> f64 {
        holders
            .aggregate::<P>(&self.world, &self.species)
            .species_total(species)
    }

    /// Count fixed map cells, land included
    pub fn cell_count(&self) -> usize {
        self.world.query::<&SpatialCell>().iter().count()
    }

    /// Count mobile devices
    pub fn fad_count(&self) -> usize {
        self.world.query::<&Fad>().iter().count()
    }

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_simulation(writer, &self.world, self.day, self.seed, &self.species)
    }

    /// Load simulation state from a reader. Registered processes and
    /// observers are kept; the random source restarts from the saved seed
    /// and day.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), crate::persistence::SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        self.world = loaded.world;
        self.day = loaded.day;
        self.seed = loaded.seed;
        self.species = Arc::new(loaded.species);
        self.rng = StdRng::seed_from_u64(self.seed.wrapping_add(u64::from(self.day)));

        Ok(())
    }
}
