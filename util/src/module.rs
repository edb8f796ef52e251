//! Module interfaces
//!
//! Every cyclic module of the walking executable (swing planner, pose filter)
//! implements [`State`], so the main loop drives them all the same way: one
//! `init` before the loop and one `proc` per control tick.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A module which is initialised once and then stepped every control tick.
pub trait State {
    /// Data needed to initialise, usually the parameter file name.
    type InitData;
    type InitError;

    /// Data consumed by one tick.
    type InputData;
    /// Data produced by one tick.
    type OutputData;
    /// Counters and flags describing what happened during one tick.
    type StatusReport;
    type ProcError;

    /// Load parameters and reset the module.
    ///
    /// Modules must return an error from `proc` until this has succeeded.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Step the module by one control tick.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
