//! # Walking library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to
//! access the modules of the walking executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Swing curves - Bezier and polynomial curves from lift-off to touchdown
pub mod curve;

/// Data store - the global state of the executable
pub mod data_store;

/// Periodic filter - smooths signals with angular channels
pub mod filter;

/// Foot targets - reference touchdown positions for each foot
pub mod foot_target;

/// Gait - contact patterns over the planning horizon
pub mod gait;

/// MPC - solver results and the wrapper handing them to the control loop
pub mod mpc;

/// Executable parameters
pub mod params;

/// Swing trajectory planning - per tick foot kinematics
pub mod swing_traj;
