//! Parametric swing curves
//!
//! A curve is parameterised by a normalised phase `s` in `[0, 1]` and has a
//! fixed duration, so that derivatives can be returned with respect to time
//! rather than with respect to `s`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bezier;
mod poly;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

pub use bezier::*;
pub use poly::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic state of a curve at one instant.
///
/// Derivatives are with respect to time, not the curve parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurveSample {
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Units: meters/second
    pub velocity_ms: Vector3<f64>,

    /// Units: meters/second^2
    pub acceleration_mss: Vector3<f64>,

    /// Units: meters/second^3
    pub jerk_msss: Vector3<f64>,
}

/// Boundary state a swing curve must start from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartState {
    pub position_m: Vector3<f64>,
    pub velocity_ms: Vector3<f64>,
    pub acceleration_mss: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The family of curve used for swing trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Bezier,
    Polynomial,
}

/// Errors raised while building a curve.
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    #[error("Invalid curve configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A curve which a swinging foot can follow.
pub trait SwingCurve: std::fmt::Debug + Send {
    /// Sample the curve at the normalised parameter `s`.
    ///
    /// Values of `s` outside `[0, 1]` are clamped.
    fn sample(&self, s: f64) -> CurveSample;

    /// Total duration of the curve.
    ///
    /// Units: seconds
    fn duration_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CurveSample {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            velocity_ms: Vector3::zeros(),
            acceleration_mss: Vector3::zeros(),
            jerk_msss: Vector3::zeros(),
        }
    }
}

impl StartState {
    /// A foot resting at the given position.
    pub fn at_rest(position_m: Vector3<f64>) -> Self {
        Self {
            position_m,
            velocity_ms: Vector3::zeros(),
            acceleration_mss: Vector3::zeros(),
        }
    }
}

impl From<&CurveSample> for StartState {
    fn from(sample: &CurveSample) -> Self {
        Self {
            position_m: sample.position_m,
            velocity_ms: sample.velocity_ms,
            acceleration_mss: sample.acceleration_mss,
        }
    }
}

impl CurveKind {
    /// Build a swing curve of this kind.
    ///
    /// `degree` is only used by Bezier curves. If `apex_m` is given the curve
    /// passes through that height at `s = 0.5`.
    pub fn build(
        &self,
        start: &StartState,
        touchdown_m: &Vector3<f64>,
        duration_s: f64,
        apex_m: Option<f64>,
        degree: usize,
    ) -> Result<Box<dyn SwingCurve>, CurveError> {
        Ok(match self {
            CurveKind::Bezier => Box::new(BezierCurve::swing(
                start,
                touchdown_m,
                duration_s,
                apex_m,
                degree,
            )?),
            CurveKind::Polynomial => Box::new(PolynomialCurve::swing(
                start,
                touchdown_m,
                duration_s,
                apex_m,
            )?),
        })
    }
}

/// Check a curve duration is usable.
pub(crate) fn check_duration(duration_s: f64) -> Result<(), CurveError> {
    if duration_s.is_finite() && duration_s > 0.0 {
        Ok(())
    } else {
        Err(CurveError::InvalidConfig(format!(
            "curve duration must be positive, found {} s",
            duration_s
        )))
    }
}
