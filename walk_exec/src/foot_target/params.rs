//! Parameters structure for the foot target generator

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::TargetError;
use crate::swing_traj::NUM_FEET;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the foot target generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Time between ticks.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// Number of ticks the targets hold at the initial footsteps.
    pub initial_delay_ticks: usize,

    /// Motion followed after the delay.
    pub motion: TargetMotion,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reference motion of a foot target.
///
/// Each motion is relative to the moving foot's initial footstep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TargetMotion {
    /// Every target stays at its initial footstep.
    Static,

    /// Per axis sinusoid, `offset + amplitude * sin(2 pi f t + phase)`.
    Circle {
        foot: usize,

        /// Units: meters
        amplitude_m: [f64; 3],

        /// Units: meters
        offset_m: [f64; 3],

        /// Units: hertz
        freq_hz: [f64; 3],

        /// Units: radians
        phase_rad: [f64; 3],
    },

    /// Linear ramp to `end_offset_m` over `ramp_ticks`, then hold.
    Ramp {
        foot: usize,

        /// Units: meters
        end_offset_m: [f64; 3],

        ramp_ticks: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), TargetError> {
        if !(self.dt_s.is_finite() && self.dt_s > 0.0) {
            return Err(TargetError::InvalidConfig(format!(
                "dt_s must be positive, found {}",
                self.dt_s
            )));
        }

        match self.motion {
            TargetMotion::Static => Ok(()),
            TargetMotion::Circle {
                foot,
                amplitude_m,
                offset_m,
                freq_hz,
                phase_rad,
            } => {
                check_foot(foot)?;
                let mut all = amplitude_m
                    .iter()
                    .chain(offset_m.iter())
                    .chain(freq_hz.iter())
                    .chain(phase_rad.iter());
                if all.any(|v| !v.is_finite()) {
                    return Err(TargetError::InvalidConfig(
                        "circle parameters must be finite".into(),
                    ));
                }
                Ok(())
            }
            TargetMotion::Ramp {
                foot,
                end_offset_m,
                ramp_ticks,
            } => {
                check_foot(foot)?;
                if ramp_ticks == 0 {
                    return Err(TargetError::InvalidConfig(
                        "ramp_ticks must be at least 1".into(),
                    ));
                }
                if end_offset_m.iter().any(|v| !v.is_finite()) {
                    return Err(TargetError::InvalidConfig(
                        "ramp offset must be finite".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            dt_s: 0.001,
            initial_delay_ticks: 1000,
            motion: TargetMotion::Static,
        }
    }
}

fn check_foot(foot: usize) -> Result<(), TargetError> {
    if foot < NUM_FEET {
        Ok(())
    } else {
        Err(TargetError::InvalidConfig(format!(
            "foot index {} is out of range",
            foot
        )))
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
        let p: Params =
            util::params::from_str(include_str!("../../../params/foot_target.toml")).unwrap();
        p.validate().unwrap();
        match p.motion {
            TargetMotion::Circle { foot, amplitude_m, offset_m, .. } => {
                assert_eq!(foot, 1);

                // Feet land on flat ground, any height motion would be lost
                assert_eq!(amplitude_m[2], 0.0);
                assert_eq!(offset_m[2], 0.0);
            }
            m => panic!("expected a circle, found {:?}", m),
        }
    }

    #[test]
    fn test_parse_variants() {
        let p: Params = util::params::from_str(
            "dt_s = 0.002\ninitial_delay_ticks = 0\n[motion]\ntype = \"Static\"\n",
        )
        .unwrap();
        assert_eq!(p.motion, TargetMotion::Static);

        let p: Params = util::params::from_str(
            "dt_s = 0.001\ninitial_delay_ticks = 10\n[motion]\ntype = \"Ramp\"\nfoot = 4\nend_offset_m = [0.0, 0.0, 0.05]\nramp_ticks = 100\n",
        )
        .unwrap();
        assert!(p.validate().is_err());
    }
}
