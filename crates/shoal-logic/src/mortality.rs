//! Natural mortality from several named sources.
//!
//! Rates are instantaneous and annual. Over a fraction `f` of the period a
//! cohort of `n` fish with total rate `Z` keeps `n * exp(-Z * f)`; the dead
//! are split between sources in proportion to their rates (Baranov).

use crate::error::ConfigError;
use crate::input::MortalityRecord;
use crate::pool::{AbundanceMatrix, AbundancePool};
use crate::species::SpeciesSet;

/// Fish removed from one cohort by one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Death<'a> {
    pub species: usize,
    pub source: &'a str,
    pub subdivision: usize,
    pub bin: usize,
    pub count: f64,
}

/// Rates for one species, indexed `[source][subdivision * bins + bin]`.
#[derive(Debug, Clone, Default, PartialEq)]
struct SpeciesRates {
    sources: Vec<String>,
    rates: Vec<Vec<f64>>,
    bins: usize,
}

impl SpeciesRates {
    fn total(&self, cohort: usize) -> f64 {
        self.rates.iter().map(|r| r[cohort]).sum()
    }
}

/// Mortality rates for every species in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct MortalityTable {
    species: Vec<SpeciesRates>,
}

impl MortalityTable {
    /// A table that kills nothing.
    pub fn none(species: &SpeciesSet) -> Self {
        Self {
            species: species
                .iter()
                .map(|s| SpeciesRates {
                    bins: s.bin_count(),
                    ..SpeciesRates::default()
                })
                .collect(),
        }
    }

    /// Build from input rows, checking every row against species metadata.
    /// Cohorts without a row for a source have a rate of zero from it.
    pub fn from_records(
        species: &SpeciesSet,
        records: &[MortalityRecord],
    ) -> Result<Self, ConfigError> {
        let mut table = Self::none(species);
        for record in records {
            let (idx, meta) = species.require(&record.species)?;
            let sub = meta.subdivision_index(&record.sex)?;
            if record.bin >= meta.bin_count() {
                return Err(ConfigError::DimensionMismatch {
                    species: meta.name.clone(),
                    what: "mortality bins",
                    expected: meta.bin_count(),
                    found: record.bin + 1,
                });
            }
            if !(record.rate.is_finite() && record.rate >= 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "mortality rate",
                    reason: format!("{} from {}: {}", meta.name, record.source, record.rate),
                });
            }
            let rates = &mut table.species[idx];
            let source = match rates.sources.iter().position(|s| *s == record.source) {
                Some(source) => source,
                None => {
                    rates.sources.push(record.source.clone());
                    rates
                        .rates
                        .push(vec![0.0; meta.subdivision_count() * meta.bin_count()]);
                    rates.sources.len() - 1
                }
            };
            rates.rates[source][sub * meta.bin_count() + record.bin] = record.rate;
        }
        log::info!(
            "Mortality table loaded: {} rows, {} species",
            records.len(),
            species.len()
        );
        Ok(table)
    }

    /// Source names for a species, in first-seen order.
    pub fn sources(&self, species: usize) -> &[String] {
        self.species
            .get(species)
            .map(|rates| rates.sources.as_slice())
            .unwrap_or(&[])
    }

    /// Kill fish in one species matrix over `year_fraction` of a period.
    pub fn apply_matrix(
        &self,
        species: usize,
        matrix: &mut AbundanceMatrix,
        year_fraction: f64,
        on_death: &mut dyn FnMut(Death<'_>),
    ) {
        let Some(rates) = self.species.get(species) else {
            return;
        };
        if rates.sources.is_empty() || year_fraction <= 0.0 {
            return;
        }
        for sub in 0..matrix.subdivisions() {
            for bin in 0..matrix.bins() {
                let cohort = sub * rates.bins + bin;
                let z = rates.total(cohort);
                let n = matrix.get(sub, bin);
                if z <= 0.0 || n <= 0.0 {
                    continue;
                }
                let survivors = n * (-z * year_fraction).exp();
                let dead = n - survivors;
                matrix.set(sub, bin, survivors);
                for (source, source_rates) in rates.sources.iter().zip(&rates.rates) {
                    let count = dead * source_rates[cohort] / z;
                    if count > 0.0 {
                        on_death(Death {
                            species,
                            source,
                            subdivision: sub,
                            bin,
                            count,
                        });
                    }
                }
            }
        }
    }

    /// Kill fish in every species of a pool.
    pub fn apply(
        &self,
        pool: &mut AbundancePool,
        year_fraction: f64,
        on_death: &mut dyn FnMut(Death<'_>),
    ) {
        for species in 0..pool.matrices().len() {
            self.apply_matrix(species, pool.matrix_mut(species), year_fraction, on_death);
        }
    }
}
