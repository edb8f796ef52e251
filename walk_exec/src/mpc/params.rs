//! Parameters structure for the MPC

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{MpcDims, MpcError};
use crate::gait::GaitType;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the MPC and its wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {

    // ---- PROBLEM SHAPE ----

    /// Number of steps in the planning horizon.
    pub horizon: usize,

    /// Dimension of the state vector.
    pub nx: usize,

    /// Dimension of the control vector.
    pub nu: usize,

    /// Dimension of the state tangent space.
    pub ndx: usize,

    /// Number of feedback gain matrices kept, defaults to the horizon.
    pub window_size: Option<usize>,

    // ---- TIMING ----

    /// Duration of one MPC step.
    ///
    /// Units: seconds
    pub dt_mpc_s: f64,

    /// Run the solver on a worker thread rather than inline.
    pub asynchronous: bool,

    // ---- GAIT ----

    /// Preset gait the solver plans with.
    pub gait_type: GaitType,

    /// Number of MPC steps in one gait cycle.
    pub gait_cycle_rows: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The result dimensions described by these parameters.
    pub fn dims(&self) -> Result<MpcDims, MpcError> {
        MpcDims::new(
            self.horizon,
            self.nx,
            self.nu,
            self.ndx,
            self.window_size.unwrap_or(self.horizon),
        )
    }

    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), MpcError> {
        self.dims()?;

        if !(self.dt_mpc_s.is_finite() && self.dt_mpc_s > 0.0) {
            return Err(MpcError::InvalidConfig(format!(
                "dt_mpc_s must be positive, found {}",
                self.dt_mpc_s
            )));
        }
        if self.gait_cycle_rows == 0 {
            return Err(MpcError::InvalidConfig(
                "gait_cycle_rows must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            horizon: 16,
            nx: 12,
            nu: 12,
            ndx: 12,
            window_size: None,
            dt_mpc_s: 0.02,
            asynchronous: true,
            gait_type: GaitType::Trot,
            gait_cycle_rows: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params() {
        let p: Params = util::params::from_str(include_str!("../../../params/mpc.toml")).unwrap();
        p.validate().unwrap();
        assert_eq!(p.dims().unwrap().window_size, p.window_size.unwrap_or(p.horizon));
    }

    #[test]
    fn test_validate() {
        Params::default().validate().unwrap();

        let p = Params {
            window_size: Some(40),
            ..Params::default()
        };
        assert!(p.validate().is_err());

        let p = Params {
            dt_mpc_s: 0.0,
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }
}
