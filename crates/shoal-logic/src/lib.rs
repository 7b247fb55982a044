//! Pure stock reallocation logic for Shoal.
//!
//! This crate contains everything about the spatial fish stock model that
//! does not need a live world: pool arithmetic, weight grids and their
//! time series, and the biological operators. Functions take plain data
//! and return results, so the ECS engine in `shoal-core` stays a thin
//! layer of queries around them.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`aggregate`] | Summing a collection of pools into one |
//! | [`aging`] | Moving structured counts one bin up, with a plus group |
//! | [`allocate`] | Per-cell shares of an aggregate under a grid set |
//! | [`cache`] | Keyed compute-once cache for expensive immutable loads |
//! | [`calendar`] | Month-day process dates and day-offset arithmetic |
//! | [`config`] | Schedule and grid series configuration |
//! | [`error`] | `ConfigError`, the fatal setup error |
//! | [`exclude`] | Floor-at-zero pool subtraction |
//! | [`extent`] | Longitude/latitude to grid cell projection |
//! | [`grid`] | Rectangular non-negative weight grids |
//! | [`input`] | Tabular (CSV) input records |
//! | [`mortality`] | Per-source mortality with Baranov death split |
//! | [`pool`] | The `Pool` protocol and its scalar/structured variants |
//! | [`recruitment`] | Beverton-Holt recruitment from spawning biomass |
//! | [`series`] | Dated allocation grid sets and periodic lookup |
//! | [`species`] | Species metadata (subdivisions, bins, weights) |

pub mod aggregate;
pub mod aging;
pub mod allocate;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod exclude;
pub mod extent;
pub mod grid;
pub mod input;
pub mod mortality;
pub mod pool;
pub mod recruitment;
pub mod series;
pub mod species;

pub use error::ConfigError;
pub use pool::{AbundanceMatrix, AbundancePool, BiomassPool, Pool};
pub use species::{Species, SpeciesSet};
