//! Main walking executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Base pose acquisition and filtering
//!         - MPC request and result handling
//!         - Foot target generation
//!         - Swing trajectory planning
//!         - Archiving
//!
//! The base pose is synthetic, the yaw turns continuously so the pose filter
//! has to handle the +/- pi crossing. The MPC runs the hold solver, which
//! provides the gait the swing planner follows.
//!
//! # Modules
//!
//! All cyclic modules (e.g. `swing_traj`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use walk_lib::{
    data_store::DataStore,
    filter,
    foot_target::{self, FootTarget},
    gait::Gait,
    mpc::{self, HoldSolver, MpcWrapper, SolverInput},
    params::WalkExecParams,
    swing_traj::{self, BaseFrame, BasePose, Surface, SwingTrajError, SwingTrajPlanner, NUM_FEET},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nalgebra::{DVector, Vector3, Vector6};
use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    archive::Archived,
    host,
    logger::logger_init,
    maths::wrap_to_pi,
    module::State,
    session::Session,
    time,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Frequency of the synthetic roll and pitch sway.
const SWAY_FREQUENCY_HZ: f64 = 0.5;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "walk_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    let exec_params: WalkExecParams = util::params::load(
        "walk_exec.toml"
    ).wrap_err("Could not load exec params")?;

    // Initialise logger
    logger_init(
        exec_params.min_level().wrap_err("Invalid log level")?,
        &exec_params.module_levels().wrap_err("Invalid module log level")?,
        &session
    ).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Legged Walking Executable\n");
    info!("Running on: {}", host::get_host_info());
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mpc_params: mpc::Params = util::params::load(
        "mpc.toml"
    ).wrap_err("Could not load MPC params")?;
    mpc_params.validate().wrap_err("Invalid MPC params")?;

    let target_params: foot_target::Params = util::params::load(
        "foot_target.toml"
    ).wrap_err("Could not load foot target params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    let dims = mpc_params.dims().wrap_err("Invalid MPC dimensions")?;

    let gait = Gait::from_type(
        mpc_params.gait_type,
        dims.horizon + 1,
        mpc_params.gait_cycle_rows,
        mpc_params.dt_mpc_s
    ).wrap_err("Failed to build the initial gait")?;

    ds.swing_traj.init(("swing_traj.toml", gait.clone()))
        .wrap_err("Failed to initialise SwingTraj")?;
    if (ds.swing_traj.params().dt_s - exec_params.cycle_period_s).abs() > 1e-9 {
        return Err(eyre!(
            "SwingTraj period ({} s) differs from the cycle period ({} s)",
            ds.swing_traj.params().dt_s,
            exec_params.cycle_period_s
        ));
    }
    info!("SwingTraj init complete");

    ds.pose_filter.init("filter.toml")
        .wrap_err("Failed to initialise the pose filter")?;
    if ds.pose_filter.num_channels() != 6 {
        return Err(eyre!(
            "The pose filter needs 6 channels, found {}",
            ds.pose_filter.num_channels()
        ));
    }
    info!("PoseFilter init complete");

    let foot_target = FootTarget::new(
        target_params,
        ds.swing_traj.get_foot_position()?
    ).wrap_err("Failed to initialise FootTarget")?;
    info!("FootTarget init complete");

    let solver = HoldSolver::new(dims, gait)
        .wrap_err("Failed to initialise the MPC solver")?;
    let mut mpc = MpcWrapper::new(Box::new(solver), mpc_params.asynchronous)
        .wrap_err("Failed to initialise the MPC wrapper")?;
    info!("MpcWrapper init complete");

    if exec_params.archive {
        ds.swing_traj.enable_archive(&session)
            .wrap_err("Failed to open the SwingTraj archive")?;
        ds.pose_filter.enable_archive(&session, "base_pose")
            .wrap_err("Failed to open the pose filter archive")?;
        info!("Archiving enabled");
    }

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;
    let num_cycles = exec_params.num_cycles();
    let cycles_per_solve =
        ((mpc_params.dt_mpc_s / exec_params.cycle_period_s).round() as u128).max(1);
    let surfaces: [Surface; NUM_FEET] = Default::default();

    info!(
        "Begining main loop, {} cycles with an MPC request every {} cycles\n",
        num_cycles,
        cycles_per_solve
    );

    while ds.num_cycles < num_cycles {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        let k = ds.num_cycles as usize;

        // ---- BASE POSE ----

        ds.raw_pose = synthetic_pose(&exec_params, k as f64 * exec_params.cycle_period_s);

        match ds.pose_filter.proc(&filter::InputData {
            sample: DVector::from_row_slice(&ds.raw_pose),
            check_modulo: true,
        }) {
            Ok((q, r)) => {
                ds.base_pose = BasePose::from_vector6(&Vector6::from_column_slice(q.as_slice()));
                ds.pose_filter_status_rpt = r;
            },
            Err(e) => warn!("Error during pose filtering: {}", e)
        };

        // ---- MPC ----

        if ds.num_cycles % cycles_per_solve == 0 {
            let input = SolverInput {
                k,
                x0: state_vector(&ds.base_pose, dims.nx),
                footsteps_m: *ds.swing_traj.targets(),
                warm_start: None,
            };

            if let Err(e) = mpc.solve(input) {
                warn!("MPC request failed: {}", e);
            }
        }

        // A stale result keeps the current gait
        let result = mpc.get_latest_result();
        ds.mpc_result_fresh = result.new_result();
        if result.new_result() {
            ds.mpc_solving_duration_s = result.solving_duration_s();

            match result.to_gait(mpc_params.dt_mpc_s) {
                Ok(g) => if let Err(e) = ds.swing_traj.set_gait(g) {
                    warn!("Could not apply the MPC gait: {}", e)
                },
                Err(e) => warn!("MPC result has an invalid gait: {}", e)
            }
        }

        // ---- FOOT TARGETS ----

        let targets_m = foot_target.compute(k);
        ds.targets_m = Some(targets_m);

        // ---- SWING TRAJECTORY PROCESSING ----

        match ds.swing_traj.proc(&swing_traj::InputData {
            k,
            targets_m,
            surfaces: surfaces.clone(),
            base_pose: ds.base_pose,
        }) {
            Ok((o, r)) => {
                ds.swing_traj_output = Some(o);
                ds.swing_traj_status_rpt = r;
            },
            Err(e) => warn!("Error during SwingTraj processing: {}", e)
        };

        let frame = ds.base_pose
            .base_frame()
            .with_twist(Vector3::zeros(), Vector3::new(0.0, 0.0, exec_params.yaw_rate_rads));
        match base_frame_output(&ds.swing_traj, &frame) {
            Ok(o) => ds.swing_traj_output_base = Some(o),
            Err(e) => warn!("Could not compute base frame kinematics: {}", e)
        };

        ds.accumulate();

        // ---- WRITE ARCHIVES ----

        if exec_params.archive {
            if let Err(e) = ds.swing_traj.write() {
                warn!("Could not write the SwingTraj archive: {}", e);
            }
            if let Err(e) = ds.pose_filter.write() {
                warn!("Could not write the pose filter archive: {}", e);
            }
        }

        if ds.is_1_hz_cycle {
            ds.log_summary();
        }

        // ---- CYCLE MANAGEMENT ----

        if exec_params.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                },
                None => {
                    warn!(
                        "Cycle overran by {:.03} ms",
                        time::std_duration_to_millis(cycle_dur - cycle_period)
                    );
                    ds.num_consec_cycle_overruns += 1;
                    ds.totals.num_cycle_overruns += 1;
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of main loop after {} cycles", ds.num_cycles);
    debug!("Run totals: {:?}", ds.totals);

    mpc.stop().wrap_err("The MPC worker did not stop cleanly")?;
    info!(
        "MPC stopped, {} requests, {} results published",
        mpc.num_requests(),
        mpc.num_published()
    );

    session.save("mpc_result.json", mpc.get_latest_result().clone());
    session.save("totals.json", ds.totals);

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Synthetic base pose `[x, y, z, roll, pitch, yaw]` at time `t_s`.
///
/// The yaw is wrapped into `(-pi, pi]` so it jumps by 2 pi once per turn.
fn synthetic_pose(params: &WalkExecParams, t_s: f64) -> [f64; 6] {
    let sway = 2.0 * PI * SWAY_FREQUENCY_HZ * t_s;

    [
        0.0,
        0.0,
        params.base_height_m,
        params.sway_amplitude_rad * sway.sin(),
        params.sway_amplitude_rad * sway.cos(),
        wrap_to_pi(params.yaw_rate_rads * t_s),
    ]
}

/// MPC state vector, the base pose followed by zeros.
fn state_vector(pose: &BasePose, nx: usize) -> DVector<f64> {
    let q = [
        pose.position_m.x,
        pose.position_m.y,
        pose.position_m.z,
        pose.rpy_rad.x,
        pose.rpy_rad.y,
        pose.rpy_rad.z,
    ];

    let mut x0 = DVector::zeros(nx);
    for (x, v) in x0.iter_mut().zip(q.iter()) {
        *x = *v;
    }
    x0
}

/// All kinematics of the last planner update in the base frame.
fn base_frame_output(
    planner: &SwingTrajPlanner,
    frame: &BaseFrame,
) -> Result<swing_traj::OutputData, SwingTrajError> {
    Ok(swing_traj::OutputData {
        position_m: planner.get_foot_position_base_frame(frame)?,
        velocity_ms: planner.get_foot_velocity_base_frame(frame)?,
        acceleration_mss: planner.get_foot_acceleration_base_frame(frame)?,
        jerk_msss: planner.get_foot_jerk_base_frame(frame)?,
    })
}
