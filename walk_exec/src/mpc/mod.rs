//! Model predictive control result handling
//!
//! The optimiser itself is not part of this module. It only defines the
//! shape of what a solver produces (`MpcResult`), the `MpcSolver` interface
//! a solver must offer, and `MpcWrapper` which runs a solver inline or on a
//! worker thread and hands complete results back to the control loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod hold_solver;
mod params;
mod result;
mod slot;
mod wrapper;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::params::LoadError;

use crate::gait::GaitError;

pub use hold_solver::*;
pub use params::*;
pub use result::*;
pub use slot::*;
pub use wrapper::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur while producing or handling MPC results.
#[derive(Debug, thiserror::Error)]
pub enum MpcError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid MPC configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch in {field}: expected {expected}, found {found}")]
    DimensionMismatch {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("Solver failed: {0}")]
    SolverFailed(String),

    #[error("The MPC worker thread is not running")]
    WorkerStopped,

    #[error("Couldn't start the MPC worker thread: {0}")]
    WorkerSpawnError(std::io::Error),

    #[error("The MPC worker thread panicked")]
    WorkerPanicked,

    #[error("Gait error: {0}")]
    GaitError(#[from] GaitError),
}

impl From<LoadError> for MpcError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}
