//! Parameters structure for the swing trajectory planner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{SwingTrajError, NUM_FEET};
use crate::curve::{CurveKind, MIN_SWING_DEGREE};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for swing trajectory planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {

    // ---- TIMING ----

    /// Control period, the time advanced on each call to `update`.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// Duration of the swing phase of each foot.
    ///
    /// Units: seconds
    pub t_swing_s: [f64; NUM_FEET],

    // ---- CURVE SHAPE ----

    /// Clearance above the higher of the lift-off and touchdown points.
    ///
    /// Units: meters
    pub step_height_m: f64,

    /// Curve family used for swing trajectories.
    pub curve_kind: CurveKind,

    /// Degree of the Bezier curves, at least 6.
    pub bezier_degree: usize,

    // ---- RE-PLANNING ----

    /// Fraction of the swing after which new targets are ignored.
    pub lock_phase: f64,

    /// Targets closer than this to the current touchdown point do not
    /// trigger a re-plan.
    ///
    /// Units: meters
    pub retarget_tolerance_m: f64,

    // ---- INITIAL STATE ----

    /// Position of each foot on initialisation.
    ///
    /// Units: meters,
    /// Frame: World
    pub footsteps_init_m: [[f64; 3]; NUM_FEET],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), SwingTrajError> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(SwingTrajError::InvalidConfig(format!(
                "dt_s must be positive, found {}",
                self.dt_s
            )));
        }

        for (foot, &t) in self.t_swing_s.iter().enumerate() {
            if !(t.is_finite() && t >= self.dt_s) {
                return Err(SwingTrajError::InvalidConfig(format!(
                    "t_swing_s of foot {} must be at least one control period, found {}",
                    foot, t
                )));
            }
        }

        if !(self.step_height_m.is_finite() && self.step_height_m >= 0.0) {
            return Err(SwingTrajError::InvalidConfig(format!(
                "step_height_m must not be negative, found {}",
                self.step_height_m
            )));
        }

        if self.curve_kind == CurveKind::Bezier && self.bezier_degree < MIN_SWING_DEGREE {
            return Err(SwingTrajError::InvalidConfig(format!(
                "bezier_degree must be at least {}, found {}",
                MIN_SWING_DEGREE, self.bezier_degree
            )));
        }

        if !(self.lock_phase > 0.0 && self.lock_phase <= 1.0) {
            return Err(SwingTrajError::InvalidConfig(format!(
                "lock_phase must be in (0, 1], found {}",
                self.lock_phase
            )));
        }

        if !(self.retarget_tolerance_m >= 0.0) {
            return Err(SwingTrajError::InvalidConfig(format!(
                "retarget_tolerance_m must not be negative, found {}",
                self.retarget_tolerance_m
            )));
        }

        if self.footsteps_init_m.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SwingTrajError::InvalidConfig(
                "footsteps_init_m must be finite".into(),
            ));
        }

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            dt_s: 0.001,
            t_swing_s: [0.16; NUM_FEET],
            step_height_m: 0.06,
            curve_kind: CurveKind::Bezier,
            bezier_degree: 6,
            lock_phase: 0.7,
            retarget_tolerance_m: 1e-4,
            footsteps_init_m: [
                [0.1946, 0.14695, 0.0],
                [0.1946, -0.14695, 0.0],
                [-0.1946, 0.14695, 0.0],
                [-0.1946, -0.14695, 0.0],
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
