//! Species metadata.
//!
//! Loading these from meristics tables is someone else's job; this module
//! only holds what the pools and operators need: subdivision names, bin
//! count, per-bin weight and length, and maturity.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One modelled species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// Subdivision names, usually sexes (`["female", "male"]`).
    pub subdivisions: Vec<String>,
    /// Weight in kg of one fish, indexed `[subdivision][bin]`.
    pub weights: Vec<Vec<f64>>,
    /// Length in cm of one fish, indexed `[subdivision][bin]`.
    pub lengths: Vec<Vec<f64>>,
    /// Fraction mature per bin.
    pub maturity: Vec<f64>,
}

impl Species {
    /// A species tracked only as a biomass total: one subdivision, one bin.
    pub fn biomass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdivisions: vec!["all".to_string()],
            weights: vec![vec![1.0]],
            lengths: vec![vec![0.0]],
            maturity: vec![1.0],
        }
    }

    /// A structured species. Every per-subdivision table must have one entry
    /// per bin, and there must be one table per subdivision.
    pub fn structured(
        name: impl Into<String>,
        subdivisions: Vec<String>,
        weights: Vec<Vec<f64>>,
        lengths: Vec<Vec<f64>>,
        maturity: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let bins = maturity.len();
        if subdivisions.is_empty() || bins == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "species",
                reason: format!("{name} needs at least one subdivision and one bin"),
            });
        }
        for (what, table) in [("weights", &weights), ("lengths", &lengths)] {
            if table.len() != subdivisions.len() {
                return Err(ConfigError::DimensionMismatch {
                    species: name,
                    what,
                    expected: subdivisions.len(),
                    found: table.len(),
                });
            }
            if let Some(row) = table.iter().find(|row| row.len() != bins) {
                return Err(ConfigError::DimensionMismatch {
                    species: name,
                    what,
                    expected: bins,
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            name,
            subdivisions,
            weights,
            lengths,
            maturity,
        })
    }

    pub fn subdivision_count(&self) -> usize {
        self.subdivisions.len()
    }

    pub fn bin_count(&self) -> usize {
        self.maturity.len()
    }

    /// Resolve a subdivision by name, or by its numeric index.
    pub fn subdivision_index(&self, label: &str) -> Result<usize, ConfigError> {
        if let Some(idx) = self
            .subdivisions
            .iter()
            .position(|s| s.eq_ignore_ascii_case(label))
        {
            return Ok(idx);
        }
        match label.parse::<usize>() {
            Ok(idx) if idx < self.subdivisions.len() => Ok(idx),
            _ => Err(ConfigError::UnknownSubdivision {
                species: self.name.clone(),
                subdivision: label.to_string(),
            }),
        }
    }

    /// Mean length across subdivisions for a bin.
    pub fn mean_length(&self, bin: usize) -> f64 {
        let n = self.lengths.len().max(1) as f64;
        self.lengths
            .iter()
            .filter_map(|row| row.get(bin))
            .sum::<f64>()
            / n
    }
}

/// The ordered species list shared by every pool in a run.
///
/// Pools store one entry per species in this order, so the index of a
/// species here is its index in every pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSet {
    species: Vec<Species>,
}

impl SpeciesSet {
    pub fn new(species: Vec<Species>) -> Self {
        Self { species }
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Species> {
        self.species.get(idx)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// Look a species up by name, failing with `UnknownSpecies`.
    pub fn require(&self, name: &str) -> Result<(usize, &Species), ConfigError> {
        self.index_of(name)
            .map(|idx| (idx, &self.species[idx]))
            .ok_or_else(|| ConfigError::UnknownSpecies(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipjack() -> Species {
        Species::structured(
            "Skipjack",
            vec!["female".into(), "male".into()],
            vec![vec![0.5, 2.0, 4.0], vec![0.4, 1.8, 3.5]],
            vec![vec![20.0, 45.0, 70.0], vec![22.0, 47.0, 74.0]],
            vec![0.0, 0.5, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_structured_dimensions() {
        let s = skipjack();
        assert_eq!(s.subdivision_count(), 2);
        assert_eq!(s.bin_count(), 3);
    }

    #[test]
    fn test_structured_rejects_ragged_tables() {
        let err = Species::structured(
            "Bigeye",
            vec!["female".into()],
            vec![vec![1.0, 2.0]],
            vec![vec![10.0]],
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DimensionMismatch {
                what: "lengths",
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_subdivision_lookup() {
        let s = skipjack();
        assert_eq!(s.subdivision_index("male").unwrap(), 1);
        assert_eq!(s.subdivision_index("FEMALE").unwrap(), 0);
        assert_eq!(s.subdivision_index("1").unwrap(), 1);
        assert!(s.subdivision_index("2").is_err());
        assert!(s.subdivision_index("juvenile").is_err());
    }

    #[test]
    fn test_mean_length() {
        let s = skipjack();
        assert!((s.mean_length(0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_species_set_lookup() {
        let set = SpeciesSet::new(vec![Species::biomass("Yellowfin"), skipjack()]);
        assert_eq!(set.index_of("Skipjack"), Some(1));
        assert!(set.require("Albacore").is_err());
    }
}
