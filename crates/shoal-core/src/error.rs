//! Run-time errors.

use shoal_logic::ConfigError;
use thiserror::Error;

use crate::persistence::SaveError;

/// Anything that aborts a simulated day or a save/load.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stage that consumes the threaded pool ran without one.
    #[error("stage {stage} needs a pool but none was produced")]
    MissingPool { stage: &'static str },

    #[error("save/load failed: {0}")]
    Save(#[from] SaveError),
}
