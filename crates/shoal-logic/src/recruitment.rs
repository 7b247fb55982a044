//! Beverton-Holt recruitment driven by female spawning biomass.

use crate::error::ConfigError;
use crate::input::RecruitmentRecord;
use crate::pool::{AbundanceMatrix, AbundancePool};
use crate::species::{Species, SpeciesSet};

/// Stock-recruitment parameters for one species.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentParams {
    /// Recruits per period of an unfished stock (R0).
    pub virgin_recruits: f64,
    /// Fraction of R0 produced at 20% of virgin spawning biomass (h).
    pub steepness: f64,
    /// Spawning biomass per recruit of an unfished stock (phi).
    pub cumulative_phi: f64,
    /// Subdivision index of the spawners.
    pub female: usize,
}

impl RecruitmentParams {
    pub fn new(
        species: &Species,
        virgin_recruits: f64,
        steepness: f64,
        cumulative_phi: f64,
        female: &str,
    ) -> Result<Self, ConfigError> {
        if !(virgin_recruits.is_finite() && virgin_recruits > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "virgin_recruits",
                reason: format!("{}: must be positive, got {virgin_recruits}", species.name),
            });
        }
        if !(steepness.is_finite() && steepness > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "steepness",
                reason: format!("{}: must be positive, got {steepness}", species.name),
            });
        }
        if !(cumulative_phi.is_finite() && cumulative_phi >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "cumulative_phi",
                reason: format!("{}: must be non-negative, got {cumulative_phi}", species.name),
            });
        }
        Ok(Self {
            virgin_recruits,
            steepness,
            cumulative_phi,
            female: species.subdivision_index(female)?,
        })
    }

    /// Sum over bins of `weight * maturity * count` in the female subdivision.
    pub fn spawning_biomass(&self, species: &Species, matrix: &AbundanceMatrix) -> f64 {
        if self.female >= matrix.subdivisions() {
            return 0.0;
        }
        matrix
            .row(self.female)
            .iter()
            .zip(&species.weights[self.female])
            .zip(&species.maturity)
            .filter(|((_, weight), _)| **weight > 0.0)
            .map(|((count, weight), maturity)| weight * maturity * count)
            .sum()
    }

    /// Recruits per period for a given spawning biomass.
    pub fn beverton_holt(&self, spawning_biomass: f64) -> f64 {
        let h = self.steepness;
        let r0 = self.virgin_recruits;
        let denominator = r0 * self.cumulative_phi * (1.0 - h) + (5.0 * h - 1.0) * spawning_biomass;
        if denominator <= 0.0 || spawning_biomass <= 0.0 {
            return 0.0;
        }
        4.0 * h * r0 * spawning_biomass / denominator
    }
}

/// Recruitment parameters per species; species without a row do not recruit.
#[derive(Debug, Clone, PartialEq)]
pub struct RecruitmentTable {
    params: Vec<Option<RecruitmentParams>>,
}

impl RecruitmentTable {
    pub fn from_records(
        species: &SpeciesSet,
        records: &[RecruitmentRecord],
    ) -> Result<Self, ConfigError> {
        let mut params = vec![None; species.len()];
        for record in records {
            let (idx, meta) = species.require(&record.species)?;
            params[idx] = Some(RecruitmentParams::new(
                meta,
                record.virgin_recruits,
                record.steepness,
                record.cumulative_phi,
                &record.female_subdivision,
            )?);
        }
        Ok(Self { params })
    }

    pub fn params(&self, species: usize) -> Option<&RecruitmentParams> {
        self.params.get(species).and_then(Option::as_ref)
    }

    /// Recruits due to every species of `pool`, scaled by `year_fraction`.
    /// `noise` is a relative perturbation: `0.1` yields 10% more recruits.
    pub fn recruits(
        &self,
        species: &SpeciesSet,
        pool: &AbundancePool,
        year_fraction: f64,
        mut noise: impl FnMut() -> f64,
    ) -> Vec<f64> {
        species
            .iter()
            .enumerate()
            .map(|(idx, meta)| {
                let Some(params) = self.params(idx) else {
                    return 0.0;
                };
                let ssb = params.spawning_biomass(meta, pool.matrix(idx));
                let yearly = params.beverton_holt(ssb);
                (yearly * year_fraction * (1.0 + noise())).max(0.0)
            })
            .collect()
    }
}

/// Add recruits into bin 0, split evenly across subdivisions.
pub fn add_recruits(pool: &mut AbundancePool, recruits: &[f64]) {
    for (idx, count) in recruits.iter().enumerate() {
        if *count <= 0.0 {
            continue;
        }
        let matrix = pool.matrix_mut(idx);
        if matrix.bins() == 0 || matrix.subdivisions() == 0 {
            continue;
        }
        let share = count / matrix.subdivisions() as f64;
        for sub in 0..matrix.subdivisions() {
            let current = matrix.get(sub, 0);
            matrix.set(sub, 0, current + share);
        }
    }
}
