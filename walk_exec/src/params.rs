//! # Walking Executable Parameters
//!
//! This module provides parameters for the walking executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use util::logger::LevelFilter;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkExecParams {

    // ---- CYCLE ----

    /// Target period of one control cycle, must match the planner's `dt_s`.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// How long to run for.
    ///
    /// Units: seconds
    pub run_duration_s: f64,

    /// Sleep to keep each cycle to `cycle_period_s`, otherwise run as fast as
    /// possible.
    pub realtime: bool,

    // ---- OUTPUT ----

    /// Write CSV archives of the planner and filter.
    pub archive: bool,

    /// Minimum log level, `Info` or more verbose.
    pub log_level: String,

    /// Log levels of individual modules, for example
    /// `"walk_lib::swing_traj" = "Debug"`.
    #[serde(default)]
    pub module_log_levels: BTreeMap<String, String>,

    // ---- SYNTHETIC BASE MOTION ----

    /// Height of the base above the ground.
    ///
    /// Units: meters
    pub base_height_m: f64,

    /// Yaw rate of the base, the yaw wraps through +/- pi.
    ///
    /// Units: radians/second
    pub yaw_rate_rads: f64,

    /// Amplitude of the roll and pitch sway.
    ///
    /// Units: radians
    pub sway_amplitude_rad: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WalkExecParams {
    /// Parse the minimum log level.
    pub fn min_level(&self) -> Result<LevelFilter, log::ParseLevelError> {
        LevelFilter::from_str(&self.log_level)
    }

    /// Parse the per-module log levels.
    pub fn module_levels(&self) -> Result<Vec<(String, LevelFilter)>, log::ParseLevelError> {
        self.module_log_levels
            .iter()
            .map(|(target, level)| Ok((target.clone(), LevelFilter::from_str(level)?)))
            .collect()
    }

    /// Number of cycles to run.
    pub fn num_cycles(&self) -> u128 {
        (self.run_duration_s / self.cycle_period_s).round().max(0.0) as u128
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params() {
        let p: WalkExecParams =
            util::params::from_str(include_str!("../../params/walk_exec.toml")).unwrap();

        assert_eq!(p.min_level().unwrap(), LevelFilter::Info);
        let levels = p.module_levels().unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].1, LevelFilter::Info);
        assert_eq!(p.num_cycles(), 10_000);
    }
}
