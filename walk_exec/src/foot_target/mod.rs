//! Foot target reference generation
//!
//! Produces the touchdown target of every foot on each tick. Targets hold
//! at the initial footsteps for an initial delay, then one foot follows a
//! reference motion.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::params::LoadError;

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while generating targets.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid foot target configuration: {0}")]
    InvalidConfig(String),
}

impl From<LoadError> for TargetError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}
