//! Process stages: the operators a schedule threads a pool through.
//!
//! Each stage states in its type what it does with the current pool:
//!
//! | Stage | Needs a pool | Leaves a pool |
//! |-------|--------------|---------------|
//! | [`Stage::Source`] | no (must be empty) | yes |
//! | [`Stage::Transform`] | yes | yes |
//! | [`Stage::Sink`] | yes | no |
//! | [`Stage::Effect`] | ignored | unchanged |
//!
//! [`validate_chain`] checks a stage list against this table when a
//! schedule is built, so a day can never start a chain that would stall.

use std::sync::Arc;

use hecs::World;
use rand::rngs::StdRng;
use rand::Rng;
use shoal_logic::aging::age_pool;
use shoal_logic::allocate::Allocate;
use shoal_logic::exclude::exclude_all;
use shoal_logic::mortality::{Death, MortalityTable};
use shoal_logic::recruitment::{add_recruits, RecruitmentTable};
use shoal_logic::{AbundancePool, ConfigError, Pool, SpeciesSet};

use super::extract::Extractor;
use super::reallocate::Reallocator;
use super::restore::Restorer;
use crate::error::SimulationError;
use crate::observer::{DeathEvent, DeathObserver};

/// Everything a stage may read or mutate on one simulated day.
pub struct ProcessContext<'a> {
    pub world: &'a mut World,
    pub species: &'a SpeciesSet,
    pub day: u32,
    pub rng: &'a mut StdRng,
    pub deaths: &'a mut dyn DeathObserver,
}

/// Produces the current pool from the world.
pub trait PoolSource<P>: Send + Sync {
    fn name(&self) -> &'static str;
    fn produce(&self, ctx: &mut ProcessContext<'_>) -> Result<P, SimulationError>;
}

/// Consumes the current pool and hands on a new one.
pub trait PoolTransform<P>: Send + Sync {
    fn name(&self) -> &'static str;
    fn transform(&self, pool: P, ctx: &mut ProcessContext<'_>) -> Result<P, SimulationError>;
}

/// Consumes the current pool and ends the chain's use of it.
pub trait PoolSink<P>: Send + Sync {
    fn name(&self) -> &'static str;
    fn consume(&self, pool: P, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError>;
}

/// Acts on the world without touching the current pool.
pub trait WorldEffect: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError>;
}

/// One operator in a day's chain.
pub enum Stage<P> {
    Source(Box<dyn PoolSource<P>>),
    Transform(Box<dyn PoolTransform<P>>),
    Sink(Box<dyn PoolSink<P>>),
    Effect(Box<dyn WorldEffect>),
}

impl<P> Stage<P> {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Source(s) => s.name(),
            Stage::Transform(s) => s.name(),
            Stage::Sink(s) => s.name(),
            Stage::Effect(s) => s.name(),
        }
    }

    /// Run this stage on the current pool and return the next one.
    pub fn run(
        &self,
        current: Option<P>,
        ctx: &mut ProcessContext<'_>,
    ) -> Result<Option<P>, SimulationError> {
        match self {
            Stage::Source(source) => source.produce(ctx).map(Some),
            Stage::Transform(transform) => {
                let pool = current.ok_or(SimulationError::MissingPool {
                    stage: transform.name(),
                })?;
                transform.transform(pool, ctx).map(Some)
            }
            Stage::Sink(sink) => {
                let pool = current.ok_or(SimulationError::MissingPool { stage: sink.name() })?;
                sink.consume(pool, ctx)?;
                Ok(None)
            }
            Stage::Effect(effect) => {
                effect.apply(ctx)?;
                Ok(current)
            }
        }
    }
}

/// Check that every stage gets the pool it needs and no pool is dropped
/// by a source overwriting it.
pub fn validate_chain<P>(offset: u32, stages: &[Stage<P>]) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidChain { offset, reason };
    let mut has_pool = false;
    for stage in stages {
        match stage {
            Stage::Source(_) if has_pool => {
                return Err(invalid(format!(
                    "{} would discard the pool produced before it",
                    stage.name()
                )));
            }
            Stage::Source(_) => has_pool = true,
            Stage::Transform(_) | Stage::Sink(_) if !has_pool => {
                return Err(invalid(format!("{} runs before any pool exists", stage.name())));
            }
            Stage::Transform(_) => {}
            Stage::Sink(_) => has_pool = false,
            Stage::Effect(_) => {}
        }
    }
    Ok(())
}

// ── Pool stages ────────────────────────────────────────────────────────

/// Sum every pool an extractor selects.
pub struct ExtractAggregate {
    pub extractor: Extractor,
}

impl<P: Pool> PoolSource<P> for ExtractAggregate {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn produce(&self, ctx: &mut ProcessContext<'_>) -> Result<P, SimulationError> {
        Ok(self.extractor.aggregate(ctx.world, ctx.species))
    }
}

/// Subtract, floored at zero, what another extractor selects. With no
/// matching holders the pool passes through untouched.
pub struct Exclude {
    pub extractor: Extractor,
}

impl<P: Pool> PoolTransform<P> for Exclude {
    fn name(&self) -> &'static str {
        "exclude"
    }

    fn transform(&self, pool: P, ctx: &mut ProcessContext<'_>) -> Result<P, SimulationError> {
        let removed: Vec<P> = self.extractor.extract(ctx.world);
        Ok(exclude_all(ctx.species, pool, &removed))
    }
}

/// Spread the pool over the fixed cells.
pub struct Reallocate<P: Allocate> {
    pub reallocator: Arc<Reallocator<P>>,
}

impl<P: Allocate> PoolSink<P> for Reallocate<P> {
    fn name(&self) -> &'static str {
        "reallocate"
    }

    fn consume(&self, pool: P, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError> {
        self.reallocator
            .reallocate(ctx.world, ctx.species, ctx.day, &pool)?;
        Ok(())
    }
}

/// Full extract, exclude, reallocate cycle as one world effect.
pub struct Restore<P: Allocate> {
    pub restorer: Restorer<P>,
}

impl<P: Allocate> WorldEffect for Restore<P> {
    fn name(&self) -> &'static str {
        "restore"
    }

    fn apply(&self, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError> {
        self.restorer.restore(ctx.world, ctx.species, ctx.day)?;
        Ok(())
    }
}

// ── Biology stages ─────────────────────────────────────────────────────

/// Natural mortality over `year_fraction` of the period.
pub struct Mortality {
    pub table: Arc<MortalityTable>,
    pub year_fraction: f64,
}

impl PoolTransform<AbundancePool> for Mortality {
    fn name(&self) -> &'static str {
        "mortality"
    }

    fn transform(
        &self,
        mut pool: AbundancePool,
        ctx: &mut ProcessContext<'_>,
    ) -> Result<AbundancePool, SimulationError> {
        let species = ctx.species;
        let day = ctx.day;
        let deaths = &mut *ctx.deaths;
        self.table
            .apply(&mut pool, self.year_fraction, &mut |death: Death<'_>| {
                let name = species.get(death.species).map_or("", |s| s.name.as_str());
                deaths.on_death(&DeathEvent {
                    day,
                    species: name,
                    source: death.source,
                    subdivision: death.subdivision,
                    bin: death.bin,
                    count: death.count,
                });
            });
        Ok(pool)
    }
}

/// Every cohort moves up one bin.
pub struct Aging;

impl PoolTransform<AbundancePool> for Aging {
    fn name(&self) -> &'static str {
        "aging"
    }

    fn transform(
        &self,
        mut pool: AbundancePool,
        _ctx: &mut ProcessContext<'_>,
    ) -> Result<AbundancePool, SimulationError> {
        age_pool(&mut pool);
        Ok(pool)
    }
}

/// Beverton-Holt recruits into bin 0.
pub struct Recruitment {
    pub table: Arc<RecruitmentTable>,
    pub year_fraction: f64,
    /// Relative amplitude of uniform noise on recruits, in `[0, 1]`; 0
    /// disables it.
    pub noise: f64,
}

impl PoolTransform<AbundancePool> for Recruitment {
    fn name(&self) -> &'static str {
        "recruitment"
    }

    fn transform(
        &self,
        mut pool: AbundancePool,
        ctx: &mut ProcessContext<'_>,
    ) -> Result<AbundancePool, SimulationError> {
        let amplitude = self.noise.clamp(0.0, 1.0);
        let rng = &mut *ctx.rng;
        let recruits = self.table.recruits(ctx.species, &pool, self.year_fraction, || {
            if amplitude > 0.0 {
                rng.gen_range(-amplitude..=amplitude)
            } else {
                0.0
            }
        });
        add_recruits(&mut pool, &recruits);
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::DeathObservers;
    use rand::SeedableRng;
    use shoal_logic::BiomassPool;

    struct Constant(f64);

    impl PoolSource<BiomassPool> for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn produce(&self, _ctx: &mut ProcessContext<'_>) -> Result<BiomassPool, SimulationError> {
            Ok(BiomassPool::new(vec![self.0]))
        }
    }

    struct Double;

    impl PoolTransform<BiomassPool> for Double {
        fn name(&self) -> &'static str {
            "double"
        }

        fn transform(
            &self,
            pool: BiomassPool,
            _ctx: &mut ProcessContext<'_>,
        ) -> Result<BiomassPool, SimulationError> {
            Ok(BiomassPool::new(vec![pool.get(0) * 2.0]))
        }
    }

    struct Discard;

    impl PoolSink<BiomassPool> for Discard {
        fn name(&self) -> &'static str {
            "discard"
        }

        fn consume(
            &self,
            _pool: BiomassPool,
            _ctx: &mut ProcessContext<'_>,
        ) -> Result<(), SimulationError> {
            Ok(())
        }
    }

    fn source() -> Stage<BiomassPool> {
        Stage::Source(Box::new(Constant(3.0)))
    }

    fn double() -> Stage<BiomassPool> {
        Stage::Transform(Box::new(Double))
    }

    fn sink() -> Stage<BiomassPool> {
        Stage::Sink(Box::new(Discard))
    }

    #[test]
    fn test_valid_chains() {
        assert!(validate_chain(0, &[source(), double(), sink()]).is_ok());
        assert!(validate_chain(0, &[source(), sink(), source(), sink()]).is_ok());
        // A trailing pool is simply discarded.
        assert!(validate_chain(0, &[source(), double()]).is_ok());
        assert!(validate_chain::<BiomassPool>(0, &[]).is_ok());
    }

    #[test]
    fn test_invalid_chains() {
        assert!(matches!(
            validate_chain(4, &[double(), sink()]),
            Err(ConfigError::InvalidChain { offset: 4, .. })
        ));
        assert!(validate_chain(0, &[source(), sink(), sink()]).is_err());
        assert!(validate_chain(0, &[source(), source(), sink()]).is_err());
    }

    #[test]
    fn test_exclude_stage_subtracts_devices_or_passes_through() {
        let species = SpeciesSet::new(vec![shoal_logic::Species::biomass("A")]);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut deaths = DeathObservers::new();
        let stage = Exclude {
            extractor: Extractor::mobile_only(),
        };

        let mut ctx = ProcessContext {
            world: &mut world,
            species: &species,
            day: 1,
            rng: &mut rng,
            deaths: &mut deaths,
        };
        let pool = stage.transform(BiomassPool::new(vec![8.0]), &mut ctx).unwrap();
        assert_eq!(pool.get(0), 8.0);

        ctx.world.spawn((crate::components::Fad { id: 1 }, BiomassPool::new(vec![3.0])));
        ctx.world.spawn((crate::components::Fad { id: 2 }, BiomassPool::new(vec![4.0])));
        let pool = stage.transform(pool, &mut ctx).unwrap();
        assert_eq!(pool.get(0), 1.0);
        let pool = stage.transform(pool, &mut ctx).unwrap();
        assert_eq!(pool.get(0), 0.0);
    }

    #[test]
    fn test_run_threads_pool() {
        let species = SpeciesSet::new(vec![shoal_logic::Species::biomass("A")]);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut deaths = DeathObservers::new();
        let mut ctx = ProcessContext {
            world: &mut world,
            species: &species,
            day: 1,
            rng: &mut rng,
            deaths: &mut deaths,
        };

        let current = source().run(None, &mut ctx).unwrap();
        let current = double().run(current, &mut ctx).unwrap();
        assert_eq!(current.as_ref().map(|p| p.get(0)), Some(6.0));
        assert!(sink().run(current, &mut ctx).unwrap().is_none());
        assert!(matches!(
            sink().run(None, &mut ctx),
            Err(SimulationError::MissingPool { stage: "discard" })
        ));
    }
}
