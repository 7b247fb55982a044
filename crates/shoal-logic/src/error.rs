//! Fatal configuration errors.
//!
//! Anything in here aborts setup (or the run, when a schedule meets a grid
//! set it cannot use). Nothing is retried or degraded.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading inputs or assembling schedules.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A species or (species, size class) key has no grid for the current day.
    #[error("no allocation grid for {key} at day offset {offset}")]
    MissingGrid { key: String, offset: u32 },

    /// An input produced zero usable rows.
    #[error("input {input} yielded no rows")]
    EmptySource { input: String },

    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("malformed tabular input: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Loaded table dimensions disagree with species metadata.
    #[error("{species}: {what} has {found} entries, expected {expected}")]
    DimensionMismatch {
        species: String,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unknown species {0:?}")]
    UnknownSpecies(String),

    #[error("species {species} has no subdivision {subdivision:?}")]
    UnknownSubdivision {
        species: String,
        subdivision: String,
    },

    /// The schedule references a day offset that the grid series lacks.
    #[error("day offset {offset} is scheduled but has no allocation grids")]
    UnscheduledOffset { offset: u32 },

    #[error("period must be at least one day")]
    InvalidPeriod,

    /// Normalization was requested for a grid whose weights sum to zero.
    #[error("grid {key} at day offset {offset} sums to zero and cannot be normalized")]
    ZeroSumGrid { key: String, offset: u32 },

    /// A grid puts weight on the map but none of it on a cell holding stock.
    #[error("grid {key} at day offset {offset} has no weight on any stock-holding cell")]
    StrandedWeight { key: String, offset: u32 },

    /// The requested anchor date has no rows, so day offset 0 would be empty.
    #[error("no grid rows on anchor date {date}")]
    MissingAnchor { date: chrono::NaiveDate },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A process chain whose stages cannot be threaded together.
    #[error("invalid process chain at day offset {offset}: {reason}")]
    InvalidChain { offset: u32, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
