//! ProcessSchedule: which chain of stages runs on which day offset.
//!
//! Two levels of scheduling:
//! - The engine calls every registered [`DailyStep`] once per simulated day.
//! - A [`ProcessSchedule`] maps the day onto its period and runs the chain
//!   stored for that offset, if any, in its fixed order.
//!
//! Schedules are built once and never change. Construction fails if an
//! offset has no grid set or a chain cannot be threaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use hecs::World;
use shoal_logic::allocate::Allocate;
use shoal_logic::config::ScheduleConfig;
use shoal_logic::mortality::MortalityTable;
use shoal_logic::recruitment::RecruitmentTable;
use shoal_logic::series::{GridTimeSeries, PeriodicStepMapper};
use shoal_logic::{AbundancePool, ConfigError, SpeciesSet};

use super::extract::Extractor;
use super::reallocate::Reallocator;
use super::restore::Restorer;
use super::stages::{
    validate_chain, Aging, Exclude, ExtractAggregate, Mortality, ProcessContext, Reallocate,
    Recruitment, Restore, Stage,
};
use crate::error::SimulationError;

/// Contract between the engine and anything it runs once per day.
pub trait DailyStep: Send + Sync {
    /// Called once before the first day.
    fn start(&self, _world: &mut World, _species: &SpeciesSet) -> Result<(), SimulationError> {
        Ok(())
    }

    /// Called once per simulated day, after the day counter advances.
    fn step(&self, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError>;
}

/// Day offset to ordered stage list, plus the period mapping.
pub struct ProcessSchedule<P> {
    entries: BTreeMap<u32, Vec<Stage<P>>>,
    mapper: PeriodicStepMapper,
}

impl<P> ProcessSchedule<P> {
    /// Validate and freeze a schedule against the grid series it will run
    /// with. Every offset must have a grid set.
    pub fn new(
        grids: &GridTimeSeries,
        entries: BTreeMap<u32, Vec<Stage<P>>>,
    ) -> Result<Self, ConfigError> {
        for (offset, stages) in &entries {
            if !grids.contains_offset(*offset) {
                return Err(ConfigError::UnscheduledOffset { offset: *offset });
            }
            validate_chain(*offset, stages)?;
        }
        log::info!(
            "built process schedule: {} day offsets, {} stages",
            entries.len(),
            entries.values().map(Vec::len).sum::<usize>()
        );
        Ok(Self {
            entries,
            mapper: grids.step_mapper(),
        })
    }

    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Stage names at an offset, in execution order.
    pub fn stage_names(&self, offset: u32) -> Vec<&'static str> {
        self.entries
            .get(&offset)
            .map(|stages| stages.iter().map(Stage::name).collect())
            .unwrap_or_default()
    }

    pub fn period(&self) -> u32 {
        self.mapper.period()
    }

    /// Run the chain scheduled for `ctx.day`. Day 0 never runs.
    pub fn run_day(&self, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError> {
        if ctx.day == 0 {
            return Ok(());
        }
        let offset = self.mapper.offset(ctx.day);
        let Some(stages) = self.entries.get(&offset) else {
            return Ok(());
        };
        log::debug!(
            "day {} (offset {offset}): running {} stages",
            ctx.day,
            stages.len()
        );
        let mut current: Option<P> = None;
        for stage in stages {
            current = stage.run(current, ctx)?;
        }
        Ok(())
    }
}

impl<P: Send + Sync> DailyStep for ProcessSchedule<P> {
    fn start(&self, _world: &mut World, _species: &SpeciesSet) -> Result<(), SimulationError> {
        log::info!(
            "process schedule started: offsets {:?}, period {}",
            self.entries.keys().collect::<Vec<_>>(),
            self.period()
        );
        Ok(())
    }

    fn step(&self, ctx: &mut ProcessContext<'_>) -> Result<(), SimulationError> {
        self.run_day(ctx)
    }
}

/// Restoration on every grid offset (or only on `offsets`, when given).
pub fn restoration_schedule<P: Allocate>(
    reallocator: Arc<Reallocator<P>>,
    offsets: Option<&[u32]>,
) -> Result<ProcessSchedule<P>, ConfigError> {
    let grids = Arc::clone(reallocator.allocation_grids());
    let offsets: Vec<u32> = match offsets {
        Some(offsets) => offsets.to_vec(),
        None => grids.offsets().collect(),
    };
    let entries = offsets
        .into_iter()
        .map(|offset| {
            let restorer = Restorer::new(Arc::clone(&reallocator));
            (offset, vec![Stage::Effect(Box::new(Restore { restorer }))])
        })
        .collect();
    ProcessSchedule::new(&grids, entries)
}

/// Biology inputs of the full daily chain.
pub struct BiologyTables {
    pub mortality: Arc<MortalityTable>,
    pub recruitment: Arc<RecruitmentTable>,
}

/// The structured-stock schedule.
///
/// Process dates get extract, exclude mobile, mortality, aging,
/// recruitment, reallocate. Every other grid offset gets extract, exclude
/// mobile, reallocate. A process date whose offset has no grid set fails
/// construction.
pub fn abundance_schedule(
    reallocator: Arc<Reallocator<AbundancePool>>,
    biology: &BiologyTables,
    config: &ScheduleConfig,
) -> Result<ProcessSchedule<AbundancePool>, ConfigError> {
    let grids = Arc::clone(reallocator.allocation_grids());
    if config.period != grids.period() {
        return Err(ConfigError::InvalidParameter {
            name: "period",
            reason: format!(
                "schedule period {} differs from grid period {}",
                config.period,
                grids.period()
            ),
        });
    }
    let noise = config.recruitment_noise;
    if !(0.0..=1.0).contains(&noise) {
        return Err(ConfigError::InvalidParameter {
            name: "recruitment_noise",
            reason: format!("amplitude {noise} must lie in [0, 1]"),
        });
    }
    let process_offsets = config.process_offsets(grids.anchor())?;

    let mut entries: BTreeMap<u32, Vec<Stage<AbundancePool>>> = BTreeMap::new();
    for offset in grids.offsets().chain(process_offsets.iter().copied()) {
        if entries.contains_key(&offset) {
            continue;
        }
        let mut stages: Vec<Stage<AbundancePool>> = vec![
            Stage::Source(Box::new(ExtractAggregate {
                extractor: Extractor::all(),
            })),
            Stage::Transform(Box::new(Exclude {
                extractor: Extractor::mobile_only(),
            })),
        ];
        if process_offsets.contains(&offset) {
            let year_fraction = elapsed_fraction(&process_offsets, offset, config.period);
            stages.push(Stage::Transform(Box::new(Mortality {
                table: Arc::clone(&biology.mortality),
                year_fraction,
            })));
            stages.push(Stage::Transform(Box::new(Aging)));
            stages.push(Stage::Transform(Box::new(Recruitment {
                table: Arc::clone(&biology.recruitment),
                year_fraction,
                noise,
            })));
        }
        stages.push(Stage::Sink(Box::new(Reallocate {
            reallocator: Arc::clone(&reallocator),
        })));
        entries.insert(offset, stages);
    }
    ProcessSchedule::new(&grids, entries)
}

/// Fraction of the period since the previous process offset, wrapping
/// around the period. A single process date covers the whole period.
fn elapsed_fraction(process_offsets: &[u32], offset: u32, period: u32) -> f64 {
    let previous = process_offsets
        .iter()
        .copied()
        .filter(|o| *o < offset)
        .max()
        .or_else(|| process_offsets.iter().copied().max());
    let days = match previous {
        Some(prev) if prev < offset => offset - prev,
        Some(prev) if prev > offset => offset + period - prev,
        _ => period,
    };
    f64::from(days) / f64::from(period)
}
