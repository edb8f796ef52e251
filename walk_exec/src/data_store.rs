//! # Data Store

use log::info;
use nalgebra::Matrix3x4;

use crate::{
    filter::{self, PeriodicFilter},
    swing_traj::{self, BasePose, SwingTrajPlanner},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time
    pub sim_time_s: f64,

    // Base pose
    /// Raw `[x, y, z, roll, pitch, yaw]` of the base before filtering
    pub raw_pose: [f64; 6],

    /// Filtered base pose
    pub base_pose: BasePose,

    // Filter
    pub pose_filter: PeriodicFilter,
    pub pose_filter_status_rpt: filter::StatusReport,

    // MPC
    /// True if the MPC result of this cycle is fresh
    pub mpc_result_fresh: bool,

    /// Solve time of the last fresh result
    pub mpc_solving_duration_s: f64,

    // Targets
    pub targets_m: Option<Matrix3x4<f64>>,

    // SwingTraj
    pub swing_traj: SwingTrajPlanner,
    pub swing_traj_output: Option<swing_traj::OutputData>,
    pub swing_traj_output_base: Option<swing_traj::OutputData>,
    pub swing_traj_status_rpt: swing_traj::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Totals over the whole run
    pub totals: Totals,
}

/// Event counts accumulated over the run.
#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct Totals {
    pub num_fresh_results: u64,
    pub num_stale_results: u64,
    pub num_liftoffs: u64,
    pub num_replans: u64,
    pub num_ignored_targets: u64,
    pub num_early_touchdowns: u64,
    pub num_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.mpc_result_fresh = false;
        self.targets_m = None;
        self.swing_traj_output = None;
        self.swing_traj_output_base = None;
        self.swing_traj_status_rpt = swing_traj::StatusReport::default();

        self.sim_time_s = util::session::get_elapsed_seconds();
    }

    /// Add this cycle's events to the run totals.
    pub fn accumulate(&mut self) {
        if self.mpc_result_fresh {
            self.totals.num_fresh_results += 1;
        } else {
            self.totals.num_stale_results += 1;
        }

        let r = &self.swing_traj_status_rpt;
        self.totals.num_liftoffs += r.num_liftoffs as u64;
        self.totals.num_replans += r.num_replans as u64;
        self.totals.num_ignored_targets += r.num_ignored_targets as u64;
        self.totals.num_early_touchdowns += r.num_early_touchdowns as u64;
    }

    /// Log a one line summary of the current state.
    pub fn log_summary(&self) {
        let yaw = self.base_pose.rpy_rad.z;
        info!(
            "cycle {}: yaw {:+.3} rad (raw {:+.3}), swinging {:?}, {} lift-offs, {} re-plans, \
            {} fresh / {} stale MPC results",
            self.num_cycles,
            yaw,
            self.raw_pose[5],
            self.swing_traj_status_rpt.swinging,
            self.totals.num_liftoffs,
            self.totals.num_replans,
            self.totals.num_fresh_results,
            self.totals.num_stale_results,
        );
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_1_hz_cycle() {
        let mut ds = DataStore::default();

        let mut flags = Vec::new();
        for _ in 0..2500 {
            ds.cycle_start(1000.0);
            flags.push(ds.is_1_hz_cycle);
            ds.num_cycles += 1;
        }

        let set: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(set, vec![0, 1000, 2000]);
    }

    #[test]
    fn test_accumulate() {
        let mut ds = DataStore::default();
        ds.cycle_start(1000.0);
        ds.mpc_result_fresh = true;
        ds.swing_traj_status_rpt.num_liftoffs = 2;
        ds.accumulate();

        ds.cycle_start(1000.0);
        assert!(!ds.mpc_result_fresh);
        assert_eq!(ds.swing_traj_status_rpt.num_liftoffs, 0);
        ds.accumulate();

        assert_eq!(ds.totals.num_fresh_results, 1);
        assert_eq!(ds.totals.num_stale_results, 1);
        assert_eq!(ds.totals.num_liftoffs, 2);
    }
}
