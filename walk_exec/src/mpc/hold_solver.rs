//! Zero-order hold solver
//!
//! Predicts that the state stays where it is with zero control effort. Used
//! to run the control loop and the wrapper without an optimiser.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use nalgebra::{DMatrix, DVector};

use super::{MpcDims, MpcError, MpcSolver, SolverInput, SolverOutput};
use crate::gait::Gait;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A solver holding the current state over the horizon.
#[derive(Debug)]
pub struct HoldSolver {
    dims: MpcDims,

    gait: Gait,

    /// Number of solves performed, the gait is rolled on every solve after
    /// the first.
    num_solves: u64,

    /// Artificial solve time, to exercise the stale result path.
    delay: Option<Duration>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HoldSolver {
    /// Create a new solver. The gait must have `horizon + 1` rows.
    pub fn new(dims: MpcDims, gait: Gait) -> Result<Self, MpcError> {
        if gait.num_rows() != dims.horizon + 1 {
            return Err(MpcError::DimensionMismatch {
                field: "gait",
                expected: format!("{} rows", dims.horizon + 1),
                found: format!("{} rows", gait.num_rows()),
            });
        }

        Ok(Self {
            dims,
            gait,
            num_solves: 0,
            delay: None,
        })
    }

    /// Make every solve take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl MpcSolver for HoldSolver {
    fn dims(&self) -> MpcDims {
        self.dims
    }

    fn solve(&mut self, input: &SolverInput) -> Result<SolverOutput, MpcError> {
        if input.x0.len() != self.dims.nx {
            return Err(MpcError::DimensionMismatch {
                field: "x0",
                expected: format!("length {}", self.dims.nx),
                found: format!("length {}", input.x0.len()),
            });
        }

        if self.num_solves > 0 {
            self.gait.roll();
        }
        self.num_solves += 1;

        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }

        let d = self.dims;
        Ok(SolverOutput {
            gait: self.gait.contacts().clone(),
            xs: vec![input.x0.clone(); d.horizon + 1],
            us: vec![DVector::zeros(d.nu); d.horizon],
            ks: vec![DMatrix::zeros(d.nu, d.ndx); d.window_size],
            num_iters: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::gait::GaitType;
    use nalgebra::Matrix3x4;

    #[test]
    fn test_hold() {
        let dims = MpcDims::new(4, 3, 2, 3, 4).unwrap();
        let gait = Gait::from_type(GaitType::Trot, 5, 4, 0.02).unwrap();
        let mut solver = HoldSolver::new(dims, gait.clone()).unwrap();

        let input = SolverInput {
            k: 0,
            x0: DVector::from_vec(vec![1.0, 2.0, 3.0]),
            footsteps_m: Matrix3x4::zeros(),
            warm_start: None,
        };

        let out = solver.solve(&input).unwrap();
        assert_eq!(&out.gait, gait.contacts());
        assert!(out.xs.iter().all(|x| *x == input.x0));

        // Gait advances one row per solve
        let out = solver.solve(&input).unwrap();
        assert_eq!(out.gait.row(0), gait.contacts().row(1));

        let bad = SolverInput {
            x0: DVector::zeros(2),
            ..input
        };
        assert!(solver.solve(&bad).is_err());
    }

    #[test]
    fn test_gait_rows_checked() {
        let dims = MpcDims::new(4, 3, 2, 3, 4).unwrap();
        let gait = Gait::from_type(GaitType::Trot, 4, 4, 0.02).unwrap();
        assert!(HoldSolver::new(dims, gait).is_err());
    }
}
