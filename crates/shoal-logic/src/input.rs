//! Tabular inputs.
//!
//! All three inputs are CSV files with a header row. Columns are matched by
//! name, so extra columns are ignored and order does not matter.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ConfigError;

/// One sample of a dated allocation grid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridRecord {
    pub date: NaiveDate,
    #[serde(alias = "species_code")]
    pub species: String,
    /// Present for grids that only govern part of a species (e.g. "small").
    #[serde(default, alias = "group")]
    pub size_class: Option<String>,
    #[serde(alias = "longitude")]
    pub lon: f64,
    #[serde(alias = "latitude")]
    pub lat: f64,
    pub value: f64,
}

/// An instantaneous annual mortality rate from one source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MortalityRecord {
    pub species: String,
    /// Subdivision name or index.
    #[serde(alias = "subdivision")]
    pub sex: String,
    #[serde(alias = "age")]
    pub bin: usize,
    pub source: String,
    #[serde(alias = "mortality")]
    pub rate: f64,
}

/// Beverton-Holt parameters for one species.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecruitmentRecord {
    pub species: String,
    pub virgin_recruits: f64,
    pub steepness: f64,
    pub cumulative_phi: f64,
    /// Subdivision holding the spawners.
    #[serde(default = "default_female")]
    pub female_subdivision: String,
}

fn default_female() -> String {
    "female".to_string()
}

/// Parse every row of a CSV reader. `label` names the input in errors.
pub fn read_records_from<T, R>(reader: R, label: &str) -> Result<Vec<T>, ConfigError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let records = csv
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()?;
    if records.is_empty() {
        return Err(ConfigError::EmptySource {
            input: label.to_string(),
        });
    }
    Ok(records)
}

/// Parse every row of a CSV file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|error| ConfigError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    read_records_from(file, &path.display().to_string())
}
