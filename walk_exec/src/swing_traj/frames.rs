//! Frame transforms for foot kinematics
//!
//! Foot trajectories are planned in the world frame. The controller works in
//! a frame attached to the moving base, so positions are rotated and offset
//! and the derivatives are compensated for the base's reference motion.
//!
//! All functions here are pure, they operate on one column per foot.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Matrix3, Matrix3x4, Vector3};
use serde::Serialize;

use super::NUM_FEET;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Description of the base frame the kinematics are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseFrame {
    /// Rotation taking world vectors into the base frame.
    pub rotation: Matrix3<f64>,

    /// Offset added after rotation.
    ///
    /// Units: meters
    pub translation_m: Vector3<f64>,

    /// Reference linear velocity of the base.
    ///
    /// Units: meters/second,
    /// Frame: Base
    pub v_ref_ms: Vector3<f64>,

    /// Reference angular velocity of the base.
    ///
    /// Units: radians/second,
    /// Frame: Base
    pub w_ref_rads: Vector3<f64>,

    /// Reference linear acceleration of the base.
    ///
    /// Units: meters/second^2,
    /// Frame: Base
    pub a_ref_mss: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BaseFrame {
    /// A static frame with the given rotation and translation.
    pub fn new(rotation: Matrix3<f64>, translation_m: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation_m,
            v_ref_ms: Vector3::zeros(),
            w_ref_rads: Vector3::zeros(),
            a_ref_mss: Vector3::zeros(),
        }
    }

    /// Set the reference velocities of the frame.
    pub fn with_twist(mut self, v_ref_ms: Vector3<f64>, w_ref_rads: Vector3<f64>) -> Self {
        self.v_ref_ms = v_ref_ms;
        self.w_ref_rads = w_ref_rads;
        self
    }

    /// Set the reference acceleration of the frame.
    pub fn with_acceleration(mut self, a_ref_mss: Vector3<f64>) -> Self {
        self.a_ref_mss = a_ref_mss;
        self
    }
}

impl Default for BaseFrame {
    fn default() -> Self {
        Self::new(Matrix3::identity(), Vector3::zeros())
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// `R p + T` for each foot.
pub fn position_to_base(frame: &BaseFrame, position_m: &Matrix3x4<f64>) -> Matrix3x4<f64> {
    let mut out = frame.rotation * position_m;
    for mut col in out.column_iter_mut() {
        col += frame.translation_m;
    }
    out
}

/// Inverse of `position_to_base`: `R^T (p_b - T)`.
pub fn position_from_base(frame: &BaseFrame, position_b_m: &Matrix3x4<f64>) -> Matrix3x4<f64> {
    let mut shifted = *position_b_m;
    for mut col in shifted.column_iter_mut() {
        col -= frame.translation_m;
    }
    frame.rotation.transpose() * shifted
}

/// `R v - v_ref - w_ref x r` for each foot, with `r` the base frame position.
pub fn velocity_to_base(
    frame: &BaseFrame,
    position_m: &Matrix3x4<f64>,
    velocity_ms: &Matrix3x4<f64>,
) -> Matrix3x4<f64> {
    let r = position_to_base(frame, position_m);
    let rv = frame.rotation * velocity_ms;

    let mut out = Matrix3x4::zeros();
    for foot in 0..NUM_FEET {
        let v = rv.column(foot) - frame.v_ref_ms - frame.w_ref_rads.cross(&r.column(foot));
        out.set_column(foot, &v);
    }
    out
}

/// `R a - a_ref - w x (w x r) - 2 w x v_rel` for each foot.
///
/// `v_rel` is the base frame velocity from `velocity_to_base`, so the
/// centripetal and Coriolis terms of the rotating frame are removed.
pub fn acceleration_to_base(
    frame: &BaseFrame,
    position_m: &Matrix3x4<f64>,
    velocity_ms: &Matrix3x4<f64>,
    acceleration_mss: &Matrix3x4<f64>,
) -> Matrix3x4<f64> {
    let r = position_to_base(frame, position_m);
    let v_rel = velocity_to_base(frame, position_m, velocity_ms);
    let ra = frame.rotation * acceleration_mss;
    let w = frame.w_ref_rads;

    let mut out = Matrix3x4::zeros();
    for foot in 0..NUM_FEET {
        let r_f: Vector3<f64> = r.column(foot).into();
        let v_f: Vector3<f64> = v_rel.column(foot).into();
        let a = ra.column(foot) - frame.a_ref_mss - w.cross(&w.cross(&r_f)) - 2.0 * w.cross(&v_f);
        out.set_column(foot, &a);
    }
    out
}

/// `R j` for each foot.
pub fn jerk_to_base(frame: &BaseFrame, jerk_msss: &Matrix3x4<f64>) -> Matrix3x4<f64> {
    frame.rotation * jerk_msss
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
