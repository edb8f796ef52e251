//! MPC result container

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::MpcError;
use crate::gait::{self, Gait, NUM_GAIT_COLS};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed dimensions of an MPC problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MpcDims {
    /// Number of steps in the planning horizon
    pub horizon: usize,

    /// State dimension
    pub nx: usize,

    /// Control dimension
    pub nu: usize,

    /// Tangent space state dimension
    pub ndx: usize,

    /// Number of feedback gains, at most the horizon
    pub window_size: usize,
}

/// Output of one solver run, before it is checked and packaged.
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub gait: DMatrix<i32>,
    pub xs: Vec<DVector<f64>>,
    pub us: Vec<DVector<f64>>,
    pub ks: Vec<DMatrix<f64>>,
    pub num_iters: u32,
}

/// The result of an MPC solve.
///
/// All storage is allocated on construction and never changes shape. A
/// result is only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MpcResult {
    dims: MpcDims,

    /// Contact flags, `horizon + 1` rows by `NUM_GAIT_COLS`.
    gait: DMatrix<i32>,

    /// Current state followed by the predicted states, `horizon + 1` long.
    xs: Vec<DVector<f64>>,

    /// Controls taking `xs[i]` to `xs[i+1]`, `horizon` long.
    us: Vec<DVector<f64>>,

    /// Feedback gains of shape `nu x ndx`, `window_size` long.
    ks: Vec<DMatrix<f64>>,

    /// Units: seconds
    solving_duration_s: f64,

    num_iters: u32,

    new_result: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpcDims {
    pub fn new(
        horizon: usize,
        nx: usize,
        nu: usize,
        ndx: usize,
        window_size: usize,
    ) -> Result<Self, MpcError> {
        if horizon == 0 || nx == 0 || nu == 0 || ndx == 0 {
            return Err(MpcError::InvalidConfig(format!(
                "horizon and dimensions must be non-zero, found horizon = {}, nx = {}, nu = {}, ndx = {}",
                horizon, nx, nu, ndx
            )));
        }
        if window_size == 0 || window_size > horizon {
            return Err(MpcError::InvalidConfig(format!(
                "window size must be in 1..={}, found {}",
                horizon, window_size
            )));
        }

        Ok(Self {
            horizon,
            nx,
            nu,
            ndx,
            window_size,
        })
    }
}

impl MpcResult {
    /// Allocate a zeroed result with the window size set to the horizon.
    pub fn new(ngait: usize, nx: usize, nu: usize, ndx: usize) -> Result<Self, MpcError> {
        Self::with_window(ngait, nx, nu, ndx, ngait)
    }

    /// Allocate a zeroed result.
    pub fn with_window(
        ngait: usize,
        nx: usize,
        nu: usize,
        ndx: usize,
        window_size: usize,
    ) -> Result<Self, MpcError> {
        Ok(Self::zeros(MpcDims::new(ngait, nx, nu, ndx, window_size)?))
    }

    /// Allocate a zeroed result for some known-good dimensions.
    pub fn zeros(dims: MpcDims) -> Self {
        Self {
            dims,
            gait: DMatrix::zeros(dims.horizon + 1, NUM_GAIT_COLS),
            xs: vec![DVector::zeros(dims.nx); dims.horizon + 1],
            us: vec![DVector::zeros(dims.nu); dims.horizon],
            ks: vec![DMatrix::zeros(dims.nu, dims.ndx); dims.window_size],
            solving_duration_s: 0.0,
            num_iters: 0,
            new_result: false,
        }
    }

    /// Package a solver output, checking every field against `dims`.
    ///
    /// The result is marked as new.
    pub fn from_output(
        dims: MpcDims,
        output: SolverOutput,
        solving_duration_s: f64,
    ) -> Result<Self, MpcError> {
        check_shape(
            "gait",
            (dims.horizon + 1, NUM_GAIT_COLS),
            output.gait.shape(),
        )?;
        gait::validate_contacts(&output.gait)?;

        check_len("xs", dims.horizon + 1, output.xs.len())?;
        for x in &output.xs {
            check_shape("xs", (dims.nx, 1), x.shape())?;
        }

        check_len("us", dims.horizon, output.us.len())?;
        for u in &output.us {
            check_shape("us", (dims.nu, 1), u.shape())?;
        }

        check_len("ks", dims.window_size, output.ks.len())?;
        for k in &output.ks {
            check_shape("ks", (dims.nu, dims.ndx), k.shape())?;
        }

        Ok(Self {
            dims,
            gait: output.gait,
            xs: output.xs,
            us: output.us,
            ks: output.ks,
            solving_duration_s,
            num_iters: output.num_iters,
            new_result: true,
        })
    }

    /// Replace every field with those of `other`.
    ///
    /// Fails without modifying `self` if the dimensions differ.
    pub fn replace_with(&mut self, other: &MpcResult) -> Result<(), MpcError> {
        if other.dims != self.dims {
            return Err(MpcError::DimensionMismatch {
                field: "dims",
                expected: format!("{:?}", self.dims),
                found: format!("{:?}", other.dims),
            });
        }

        self.clone_from(other);
        Ok(())
    }

    pub fn dims(&self) -> &MpcDims {
        &self.dims
    }

    pub fn gait(&self) -> &DMatrix<i32> {
        &self.gait
    }

    pub fn xs(&self) -> &[DVector<f64>] {
        &self.xs
    }

    pub fn us(&self) -> &[DVector<f64>] {
        &self.us
    }

    pub fn ks(&self) -> &[DMatrix<f64>] {
        &self.ks
    }

    /// Units: seconds
    pub fn solving_duration_s(&self) -> f64 {
        self.solving_duration_s
    }

    pub fn num_iters(&self) -> u32 {
        self.num_iters
    }

    /// True if this result was freshly computed, false if it is a stale
    /// result being reused while the solver works.
    pub fn new_result(&self) -> bool {
        self.new_result
    }

    pub(crate) fn set_new_result(&mut self, new_result: bool) {
        self.new_result = new_result;
    }

    /// Contact flags of the current step.
    pub fn current_contacts(&self) -> [i32; NUM_GAIT_COLS] {
        let mut row = [gait::STANCE; NUM_GAIT_COLS];
        for (foot, r) in row.iter_mut().enumerate() {
            *r = self.gait[(0, foot)];
        }
        row
    }

    /// The gait of this result, with rows lasting `dt_s`.
    pub fn to_gait(&self, dt_s: f64) -> Result<Gait, MpcError> {
        Ok(Gait::from_matrix(self.gait.clone(), dt_s)?)
    }
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), MpcError> {
    if expected == found {
        Ok(())
    } else {
        Err(MpcError::DimensionMismatch {
            field,
            expected: format!("length {}", expected),
            found: format!("length {}", found),
        })
    }
}

fn check_shape(
    field: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<(), MpcError> {
    if expected == found {
        Ok(())
    } else {
        Err(MpcError::DimensionMismatch {
            field,
            expected: format!("{}x{}", expected.0, expected.1),
            found: format!("{}x{}", found.0, found.1),
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn output(dims: &MpcDims) -> SolverOutput {
        SolverOutput {
            gait: DMatrix::from_element(dims.horizon + 1, NUM_GAIT_COLS, 1),
            xs: vec![DVector::from_element(dims.nx, 1.0); dims.horizon + 1],
            us: vec![DVector::from_element(dims.nu, 2.0); dims.horizon],
            ks: vec![DMatrix::from_element(dims.nu, dims.ndx, 3.0); dims.window_size],
            num_iters: 7,
        }
    }

    #[test]
    fn test_construction_shapes() {
        let r = MpcResult::new(3, 2, 1, 2).unwrap();

        assert_eq!(r.gait().shape(), (4, 4));
        assert!(r.gait().iter().all(|&v| v == 0));

        assert_eq!(r.xs().len(), 4);
        assert!(r.xs().iter().all(|x| x.len() == 2 && x.iter().all(|&v| v == 0.0)));

        assert_eq!(r.us().len(), 3);
        assert!(r.us().iter().all(|u| u.len() == 1 && u[0] == 0.0));

        assert_eq!(r.ks().len(), 3);
        assert!(r.ks().iter().all(|k| k.shape() == (1, 2) && k.iter().all(|&v| v == 0.0)));

        assert_eq!(r.solving_duration_s(), 0.0);
        assert_eq!(r.num_iters(), 0);
        assert!(!r.new_result());
    }

    #[test]
    fn test_window() {
        let r = MpcResult::with_window(10, 4, 2, 3, 4).unwrap();
        assert_eq!(r.ks().len(), 4);
        assert_eq!(r.xs().len(), 11);

        assert!(MpcResult::with_window(10, 4, 2, 3, 11).is_err());
        assert!(MpcResult::with_window(10, 4, 2, 3, 0).is_err());
        assert!(MpcResult::new(0, 4, 2, 3).is_err());
    }

    #[test]
    fn test_from_output() {
        let dims = MpcDims::new(5, 3, 2, 3, 2).unwrap();
        let r = MpcResult::from_output(dims, output(&dims), 0.004).unwrap();
        assert!(r.new_result());
        assert_eq!(r.num_iters(), 7);
        assert_eq!(r.current_contacts(), [1; NUM_GAIT_COLS]);
        assert_eq!(r.to_gait(0.02).unwrap().num_rows(), 6);

        let mut bad = output(&dims);
        bad.xs.pop();
        assert!(matches!(
            MpcResult::from_output(dims, bad, 0.0),
            Err(MpcError::DimensionMismatch { field: "xs", .. })
        ));

        let mut bad = output(&dims);
        bad.ks[1] = DMatrix::zeros(3, 2);
        assert!(matches!(
            MpcResult::from_output(dims, bad, 0.0),
            Err(MpcError::DimensionMismatch { field: "ks", .. })
        ));

        let mut bad = output(&dims);
        bad.gait[(2, 1)] = 3;
        assert!(matches!(
            MpcResult::from_output(dims, bad, 0.0),
            Err(MpcError::GaitError(_))
        ));
    }

    #[test]
    fn test_replace_whole() {
        let dims = MpcDims::new(5, 3, 2, 3, 2).unwrap();
        let mut r = MpcResult::zeros(dims);
        let fresh = MpcResult::from_output(dims, output(&dims), 0.01).unwrap();

        r.replace_with(&fresh).unwrap();
        assert_eq!(r, fresh);

        let mut other = MpcResult::new(4, 3, 2, 3).unwrap();
        let before = other.clone();
        assert!(other.replace_with(&fresh).is_err());
        assert_eq!(other, before);
    }
}
