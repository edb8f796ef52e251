//! Parameters structure for the periodic filter

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::FilterError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the periodic filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Number of channels in each sample.
    pub num_channels: usize,

    /// Time between samples.
    ///
    /// Units: seconds
    pub sample_period_s: f64,

    /// Cutoff frequency of the low-pass.
    ///
    /// Units: hertz
    pub cutoff_hz: f64,

    /// Indices of the channels holding angles, which wrap at +/- pi.
    ///
    /// Units: radians
    #[serde(default)]
    pub angular_channels: Vec<usize>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are consistent.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.num_channels == 0 {
            return Err(FilterError::InvalidConfig(
                "num_channels must be at least 1".into(),
            ));
        }

        if !(self.sample_period_s.is_finite() && self.sample_period_s > 0.0) {
            return Err(FilterError::InvalidConfig(format!(
                "sample_period_s must be positive, found {}",
                self.sample_period_s
            )));
        }

        if !(self.cutoff_hz.is_finite() && self.cutoff_hz > 0.0) {
            return Err(FilterError::InvalidConfig(format!(
                "cutoff_hz must be positive, found {}",
                self.cutoff_hz
            )));
        }

        validate_angular(&self.angular_channels, self.num_channels)
    }

    /// Smoothing factor of the first order low-pass.
    ///
    /// `alpha = r / (r + 1)` with `r = 2 pi dt fc`.
    pub fn alpha(&self) -> f64 {
        let r = 2.0 * PI * self.sample_period_s * self.cutoff_hz;
        r / (r + 1.0)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            num_channels: 6,
            sample_period_s: 0.001,
            cutoff_hz: 15.0,
            angular_channels: vec![3, 4, 5],
        }
    }
}

/// Check every angular channel index is in range.
pub(crate) fn validate_angular(
    angular_channels: &[usize],
    num_channels: usize,
) -> Result<(), FilterError> {
    match angular_channels.iter().find(|&&c| c >= num_channels) {
        Some(c) => Err(FilterError::InvalidConfig(format!(
            "angular channel {} is out of range for {} channels",
            c, num_channels
        ))),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shipped_params() {
        let p: Params =
            util::params::from_str(include_str!("../../../params/filter.toml")).unwrap();
        p.validate().unwrap();
        assert_eq!(p.angular_channels, vec![3, 4, 5]);
    }

    #[test]
    fn test_alpha() {
        let p = Params {
            sample_period_s: 1.0 / (2.0 * PI),
            cutoff_hz: 1.0,
            ..Params::default()
        };
        assert_relative_eq!(p.alpha(), 0.5);
    }

    #[test]
    fn test_validate() {
        Params::default().validate().unwrap();

        let mut p = Params::default();
        p.angular_channels.push(6);
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.cutoff_hz = 0.0;
        assert!(p.validate().is_err());

        let mut p = Params::default();
        p.num_channels = 0;
        p.angular_channels.clear();
        assert!(p.validate().is_err());
    }
}
