//! Periodic low-pass filter module
//!
//! Smooths multi-channel signals, some of which may be angles. Angular
//! channels are unwrapped against the previous output before filtering so a
//! signal crossing the +/- pi boundary does not produce a 2 pi jump.

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

/// Possible errors that can occur while filtering.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),

    #[error("The filter has not been initialised")]
    NotInitialised,

    #[error("Expected a sample of {expected} channels, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl From<LoadError> for FilterError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}
