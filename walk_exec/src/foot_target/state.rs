//! Implementations for the foot target generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use log::debug;
use nalgebra::{Matrix3x4, Vector3};

use super::{Params, TargetError, TargetMotion};
use util::maths::lin_map;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Generates the touchdown target of every foot on each tick.
#[derive(Debug, Clone)]
pub struct FootTarget {
    params: Params,

    /// Units: meters,
    /// Frame: World
    initial_footsteps_m: Matrix3x4<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FootTarget {
    /// Create a new generator moving away from `initial_footsteps_m`.
    pub fn new(params: Params, initial_footsteps_m: Matrix3x4<f64>) -> Result<Self, TargetError> {
        params.validate()?;

        debug!(
            "FootTarget started with {:?} after {} ticks",
            params.motion, params.initial_delay_ticks
        );

        Ok(Self {
            params,
            initial_footsteps_m,
        })
    }

    /// Targets for tick `k`.
    ///
    /// Units: meters,
    /// Frame: World
    pub fn compute(&self, k: usize) -> Matrix3x4<f64> {
        let mut out = self.initial_footsteps_m;

        if k < self.params.initial_delay_ticks {
            return out;
        }
        let k = k - self.params.initial_delay_ticks;

        match self.params.motion {
            TargetMotion::Static => (),
            TargetMotion::Circle {
                foot,
                amplitude_m,
                offset_m,
                freq_hz,
                phase_rad,
            } => {
                let t_s = k as f64 * self.params.dt_s;
                for axis in 0..3 {
                    out[(axis, foot)] += offset_m[axis]
                        + amplitude_m[axis]
                            * (2.0 * PI * freq_hz[axis] * t_s + phase_rad[axis]).sin();
                }
            }
            TargetMotion::Ramp {
                foot,
                end_offset_m,
                ramp_ticks,
            } => {
                let frac = if k >= ramp_ticks {
                    1.0
                } else {
                    lin_map((0.0, ramp_ticks as f64), (0.0, 1.0), k as f64)
                };
                let offset = Vector3::from(end_offset_m) * frac;
                let mut col = out.column_mut(foot);
                col += offset;
            }
        }

        out
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn feet() -> Matrix3x4<f64> {
        Matrix3x4::new(
            0.19, 0.19, -0.19, -0.19,
            0.15, -0.15, 0.15, -0.15,
            0.0, 0.0, 0.0, 0.0,
        )
    }

    #[test]
    fn test_initial_delay() {
        let params = Params {
            initial_delay_ticks: 10,
            motion: TargetMotion::Ramp {
                foot: 0,
                end_offset_m: [0.0, 0.0, 0.05],
                ramp_ticks: 100,
            },
            ..Params::default()
        };
        let target = FootTarget::new(params, feet()).unwrap();

        assert_eq!(target.compute(0), feet());
        assert_eq!(target.compute(9), feet());
        assert_eq!(target.compute(10), feet());
    }

    #[test]
    fn test_ramp() {
        let params = Params {
            initial_delay_ticks: 0,
            motion: TargetMotion::Ramp {
                foot: 2,
                end_offset_m: [0.0, 0.0, 0.05],
                ramp_ticks: 100,
            },
            ..Params::default()
        };
        let target = FootTarget::new(params, feet()).unwrap();

        assert_relative_eq!(target.compute(50)[(2, 2)], 0.025);
        assert_relative_eq!(target.compute(100)[(2, 2)], 0.05);
        assert_relative_eq!(target.compute(5000)[(2, 2)], 0.05);

        // Other feet never move
        let out = target.compute(70);
        for foot in [0, 1, 3].iter() {
            assert_eq!(out.column(*foot), feet().column(*foot));
        }
    }

    #[test]
    fn test_circle() {
        let params = Params {
            dt_s: 0.001,
            initial_delay_ticks: 0,
            motion: TargetMotion::Circle {
                foot: 1,
                amplitude_m: [0.05, 0.0, 0.04],
                offset_m: [0.05, 0.0, 0.05],
                freq_hz: [0.5, 0.0, 0.5],
                phase_rad: [-PI / 2.0, 0.0, -PI / 2.0],
            },
        };
        let target = FootTarget::new(params, feet()).unwrap();

        // Starts at the initial footstep in x, peaks after half a period
        let start = target.compute(0);
        assert_relative_eq!(start[(0, 1)], 0.19, epsilon = 1e-12);
        assert_relative_eq!(start[(2, 1)], 0.01, epsilon = 1e-12);
        let peak = target.compute(1000);
        assert_relative_eq!(peak[(0, 1)], 0.19 + 0.1, epsilon = 1e-12);
        assert_relative_eq!(peak[(2, 1)], 0.09, epsilon = 1e-12);
        assert_relative_eq!(peak[(1, 1)], -0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_foot() {
        let params = Params {
            motion: TargetMotion::Ramp {
                foot: 7,
                end_offset_m: [0.0; 3],
                ramp_ticks: 1,
            },
            ..Params::default()
        };
        assert!(FootTarget::new(params, feet()).is_err());
    }
}
