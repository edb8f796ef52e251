//! Swing trajectory planning module
//!
//! Produces the desired position, velocity, acceleration and jerk of every
//! foot on each control tick. Feet in stance hold still, feet in swing
//! follow a curve from lift-off to their touchdown target.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod frames;
mod params;
mod state;
mod surface;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use util::params::LoadError;

use crate::{curve::CurveError, gait::GaitError};

pub use frames::BaseFrame;
pub use params::*;
pub use state::*;
pub use surface::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of feet on the robot.
pub const NUM_FEET: usize = crate::gait::NUM_GAIT_COLS;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during swing trajectory planning.
#[derive(Debug, thiserror::Error)]
pub enum SwingTrajError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid swing trajectory configuration: {0}")]
    InvalidConfig(String),

    #[error("The swing trajectory planner has not been initialised")]
    NotInitialised,

    #[error("Foot index {0} is out of range")]
    InvalidFoot(usize),

    #[error("Foot {0} has no active swing curve")]
    NoActiveCurve(usize),

    #[error("The target for foot {0} is not finite")]
    InvalidTarget(usize),

    #[error("Curve error: {0}")]
    CurveError(#[from] CurveError),

    #[error("Gait error: {0}")]
    GaitError(#[from] GaitError),
}

impl From<LoadError> for SwingTrajError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}
