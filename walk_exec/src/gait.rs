//! Gait contact patterns
//!
//! A gait is a matrix with one row per MPC step and one column per foot.
//! Each entry is `1` if the foot is in contact (stance) during that step and
//! `0` if it is swinging. Row 0 is the current step.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of columns in a gait matrix, one per foot.
pub const NUM_GAIT_COLS: usize = 4;

/// Value of a gait entry for a foot in stance.
pub const STANCE: i32 = 1;

/// Value of a gait entry for a foot in swing.
pub const SWING: i32 = 0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A contact pattern over the planning horizon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gait {
    contacts: DMatrix<i32>,

    /// Duration of one row.
    ///
    /// Units: seconds
    dt_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Preset gait patterns for a quadruped.
///
/// Feet are ordered front left, front right, hind left, hind right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaitType {
    /// All feet on the ground
    Stand,
    /// Diagonal pairs alternate
    Trot,
    /// One foot lifts at a time
    Walk,
    /// Front pair and hind pair alternate
    Bound,
}

#[derive(Debug, thiserror::Error)]
pub enum GaitError {
    #[error("Invalid gait: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GaitType {
    /// Phase offset of each foot in the cycle and the fraction of the cycle
    /// spent in stance.
    fn offsets_and_duty(&self) -> ([f64; NUM_GAIT_COLS], f64) {
        match self {
            GaitType::Stand => ([0.0; NUM_GAIT_COLS], 1.0),
            GaitType::Trot => ([0.0, 0.5, 0.5, 0.0], 0.5),
            GaitType::Walk => ([0.0, 0.5, 0.25, 0.75], 0.75),
            GaitType::Bound => ([0.0, 0.0, 0.5, 0.5], 0.5),
        }
    }
}

impl Gait {
    /// Create a gait from an explicit contact matrix.
    ///
    /// The matrix must have `NUM_GAIT_COLS` columns, at least one row, and
    /// only contain 0 or 1.
    pub fn from_matrix(contacts: DMatrix<i32>, dt_s: f64) -> Result<Self, GaitError> {
        validate_contacts(&contacts)?;

        if !(dt_s.is_finite() && dt_s > 0.0) {
            return Err(GaitError::InvalidConfig(format!(
                "row duration must be positive, found {} s",
                dt_s
            )));
        }

        Ok(Self { contacts, dt_s })
    }

    /// Create a preset gait.
    ///
    /// `cycle_rows` is the number of rows in one full gait cycle, `num_rows`
    /// the number of rows in the matrix (usually the MPC horizon plus one).
    pub fn from_type(
        gait_type: GaitType,
        num_rows: usize,
        cycle_rows: usize,
        dt_s: f64,
    ) -> Result<Self, GaitError> {
        if cycle_rows == 0 {
            return Err(GaitError::InvalidConfig(
                "a gait cycle needs at least one row".into(),
            ));
        }

        let (offsets, duty) = gait_type.offsets_and_duty();
        let stance_rows = (duty * cycle_rows as f64).round() as usize;

        let contacts = DMatrix::from_fn(num_rows, NUM_GAIT_COLS, |r, foot| {
            let offset_rows = (offsets[foot] * cycle_rows as f64).round() as usize;
            if (r + offset_rows) % cycle_rows < stance_rows {
                STANCE
            } else {
                SWING
            }
        });

        Self::from_matrix(contacts, dt_s)
    }

    /// The full contact matrix.
    pub fn contacts(&self) -> &DMatrix<i32> {
        &self.contacts
    }

    /// Number of rows (steps) in the gait.
    pub fn num_rows(&self) -> usize {
        self.contacts.nrows()
    }

    /// Duration of one row.
    ///
    /// Units: seconds
    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    /// True if the foot is swinging in the current step.
    pub fn is_swing(&self, foot: usize) -> bool {
        foot < NUM_GAIT_COLS && self.contacts[(0, foot)] == SWING
    }

    /// Advance the gait by one step, moving the current row to the end.
    pub fn roll(&mut self) {
        let n = self.contacts.nrows();
        if n < 2 {
            return;
        }

        let first = self.contacts.row(0).clone_owned();
        for r in 0..(n - 1) {
            let next = self.contacts.row(r + 1).clone_owned();
            self.contacts.set_row(r, &next);
        }
        self.contacts.set_row(n - 1, &first);
    }

    /// Duration of the first complete swing phase of a foot in the matrix,
    /// or `None` if the foot never swings.
    ///
    /// A swing phase already in progress at row 0 is skipped unless it is
    /// the only one.
    ///
    /// Units: seconds
    pub fn swing_duration_s(&self, foot: usize) -> Option<f64> {
        if foot >= NUM_GAIT_COLS {
            return None;
        }

        let col: Vec<i32> = self.contacts.column(foot).iter().copied().collect();
        let runs = swing_runs(&col);

        let run = match runs.as_slice() {
            [] => return None,
            [only] => *only,
            [(0, _), second, ..] => *second,
            [first, ..] => *first,
        };

        Some(run.1 as f64 * self.dt_s)
    }
}

/// Check a contact matrix has the right shape and binary entries.
pub fn validate_contacts(contacts: &DMatrix<i32>) -> Result<(), GaitError> {
    if contacts.ncols() != NUM_GAIT_COLS {
        return Err(GaitError::InvalidConfig(format!(
            "expected {} columns, found {}",
            NUM_GAIT_COLS,
            contacts.ncols()
        )));
    }
    if contacts.nrows() == 0 {
        return Err(GaitError::InvalidConfig("gait has no rows".into()));
    }
    if let Some(v) = contacts.iter().find(|&&v| v != STANCE && v != SWING) {
        return Err(GaitError::InvalidConfig(format!(
            "contact flags must be 0 or 1, found {}",
            v
        )));
    }

    Ok(())
}

/// Start index and length of each run of swing rows.
fn swing_runs(col: &[i32]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;

    for (i, &v) in col.iter().enumerate() {
        match (v == SWING, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i - s));
                start = None;
            }
            _ => (),
        }
    }
    if let Some(s) = start {
        runs.push((s, col.len() - s));
    }

    runs
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_presets() {
        for &t in &[GaitType::Stand, GaitType::Trot, GaitType::Walk, GaitType::Bound] {
            let g = Gait::from_type(t, 17, 16, 0.02).unwrap();
            assert_eq!(g.num_rows(), 17);
            assert!(g.contacts().iter().all(|&v| v == 0 || v == 1));
        }

        let trot = Gait::from_type(GaitType::Trot, 17, 16, 0.02).unwrap();
        assert_eq!(trot.contacts().row(0).iter().copied().collect::<Vec<_>>(), vec![1, 0, 0, 1]);
        assert_eq!(trot.contacts()[(8, 0)], 0);
        assert_eq!(trot.swing_duration_s(0), Some(8.0 * 0.02));
        assert!(trot.is_swing(1));
        assert!(!trot.is_swing(0));

        let stand = Gait::from_type(GaitType::Stand, 5, 4, 0.02).unwrap();
        assert_eq!(stand.swing_duration_s(2), None);
    }

    #[test]
    fn test_roll_is_cyclic() {
        let mut g = Gait::from_type(GaitType::Walk, 8, 8, 0.05).unwrap();
        let original = g.clone();

        g.roll();
        assert_ne!(g, original);
        assert_eq!(g.contacts().row(7), original.contacts().row(0));
        assert_eq!(g.contacts().row(0), original.contacts().row(1));

        for _ in 0..7 {
            g.roll();
        }
        assert_eq!(g, original);
    }

    #[test]
    fn test_invalid() {
        assert!(Gait::from_matrix(DMatrix::zeros(3, 3), 0.01).is_err());
        assert!(Gait::from_matrix(DMatrix::from_element(3, 4, 2), 0.01).is_err());
        assert!(Gait::from_matrix(DMatrix::zeros(0, 4), 0.01).is_err());
        assert!(Gait::from_matrix(DMatrix::zeros(3, 4), 0.0).is_err());
        assert!(Gait::from_type(GaitType::Trot, 4, 0, 0.01).is_err());
    }
}
