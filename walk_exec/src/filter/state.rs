//! Implementations for the periodic filter state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;

use log::{debug, trace};
use nalgebra::DVector;
use serde::Serialize;

// Internal
use super::{params::validate_angular, FilterError, Params};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    maths::{get_ang_dist_pi, wrap_to_pi},
    module::State,
    params,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A direct form IIR filter over several channels, some of which may be
/// angles.
///
/// The output is `y[k] = sum(b[i] x[k-i]) - sum(a[j] y[k-j])` for `j >= 1`,
/// with the coefficients normalised so that `a[0] = 1`.
pub struct PeriodicFilter {
    initialised: bool,

    num_channels: usize,

    b: Vec<f64>,

    a: Vec<f64>,

    /// True for each channel which holds an angle.
    angular: Vec<bool>,

    /// Past inputs, most recent first. Always `b.len()` long once primed.
    x_queue: VecDeque<DVector<f64>>,

    /// Past outputs, most recent first. Always `a.len() - 1` long once
    /// primed.
    y_queue: VecDeque<DVector<f64>>,

    /// Last raw sample.
    x: DVector<f64>,

    /// Last output.
    y: DVector<f64>,

    primed: bool,

    report: StatusReport,

    arch: Archiver,
}

/// Input data for one filter step.
#[derive(Debug, Clone)]
pub struct InputData {
    pub sample: DVector<f64>,

    /// Unwrap the angular channels, if false every channel is linear.
    pub check_modulo: bool,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Number of samples filtered since the last reset.
    pub num_samples: u64,

    /// Number of times an angular output was wrapped back into range.
    pub num_wraps: u64,
}

/// One archived row, one per channel per sample.
#[derive(Serialize)]
struct ChannelRecord {
    time_s: f64,
    sample: u64,
    channel: usize,
    angular: bool,
    raw: f64,
    filtered: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for PeriodicFilter {
    type InitData = &'static str;
    type InitError = FilterError;

    type InputData = InputData;
    type OutputData = DVector<f64>;
    type StatusReport = StatusReport;
    type ProcError = FilterError;

    /// Initialise the filter.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        self.initialize(&params)
    }

    /// Filter one sample.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let y = self.filter(&input_data.sample, input_data.check_modulo)?;
        Ok((y, self.report))
    }
}

impl Archived for PeriodicFilter {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let time_s = session::get_elapsed_seconds();

        for channel in 0..self.num_channels {
            let rec = ChannelRecord {
                time_s,
                sample: self.report.num_samples,
                channel,
                angular: self.angular[channel],
                raw: self.x[channel],
                filtered: self.y[channel],
            };
            self.arch.serialise(rec)?;
        }

        Ok(())
    }
}

impl Default for PeriodicFilter {
    fn default() -> Self {
        Self {
            initialised: false,
            num_channels: 0,
            b: Vec::new(),
            a: Vec::new(),
            angular: Vec::new(),
            x_queue: VecDeque::new(),
            y_queue: VecDeque::new(),
            x: DVector::zeros(0),
            y: DVector::zeros(0),
            primed: false,
            report: StatusReport::default(),
            arch: Archiver::default(),
        }
    }
}

impl PeriodicFilter {
    /// Create a new, uninitialised filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set up a first order low-pass from the parameters.
    pub fn initialize(&mut self, params: &Params) -> Result<(), FilterError> {
        params.validate()?;

        let alpha = params.alpha();

        debug!(
            "PeriodicFilter low-pass at {} Hz, alpha = {:.5}, angular channels {:?}",
            params.cutoff_hz, alpha, params.angular_channels
        );

        self.initialize_with_coefficients(
            params.num_channels,
            vec![alpha],
            vec![1.0, -(1.0 - alpha)],
            &params.angular_channels,
        )
    }

    /// Set up the filter with arbitrary transfer function coefficients.
    pub fn initialize_with_coefficients(
        &mut self,
        num_channels: usize,
        b: Vec<f64>,
        a: Vec<f64>,
        angular_channels: &[usize],
    ) -> Result<(), FilterError> {
        if num_channels == 0 {
            return Err(FilterError::InvalidConfig(
                "num_channels must be at least 1".into(),
            ));
        }
        if b.is_empty() || a.is_empty() {
            return Err(FilterError::InvalidConfig(
                "filter coefficients must not be empty".into(),
            ));
        }
        if b.iter().chain(a.iter()).any(|c| !c.is_finite()) {
            return Err(FilterError::InvalidConfig(
                "filter coefficients must be finite".into(),
            ));
        }
        if a[0] == 0.0 {
            return Err(FilterError::InvalidConfig(
                "the leading denominator coefficient must not be zero".into(),
            ));
        }
        validate_angular(angular_channels, num_channels)?;

        let a0 = a[0];
        self.b = b.into_iter().map(|c| c / a0).collect();
        self.a = a.into_iter().map(|c| c / a0).collect();

        self.num_channels = num_channels;
        self.angular = vec![false; num_channels];
        for &c in angular_channels {
            self.angular[c] = true;
        }

        self.initialised = true;
        self.reset();

        Ok(())
    }

    /// Clear the history, the next sample restarts the filter.
    pub fn reset(&mut self) {
        self.x_queue.clear();
        self.y_queue.clear();
        self.x = DVector::zeros(self.num_channels);
        self.y = DVector::zeros(self.num_channels);
        self.primed = false;
        self.report = StatusReport::default();
    }

    /// Open the CSV archive for this filter in the session.
    pub fn enable_archive(&mut self, session: &Session, name: &str) -> Result<(), ArchiveError> {
        self.arch = Archiver::from_path(session, format!("filter/{}.csv", name))?;
        Ok(())
    }

    /// Filter a new sample, returning the smoothed estimate.
    ///
    /// If `check_modulo` is set angular channels are unwrapped against the
    /// previous output, and their output is wrapped into `(-pi, pi]`.
    pub fn filter(
        &mut self,
        x: &DVector<f64>,
        check_modulo: bool,
    ) -> Result<DVector<f64>, FilterError> {
        if !self.initialised {
            return Err(FilterError::NotInitialised);
        }
        if x.len() != self.num_channels {
            return Err(FilterError::DimensionMismatch {
                expected: self.num_channels,
                found: x.len(),
            });
        }

        self.x = x.clone();
        let mut x = x.clone();

        if !self.primed {
            if check_modulo {
                for c in self.angular_indices() {
                    x[c] = wrap_to_pi(x[c]);
                }
            }

            // No start-up transient
            self.x_queue = VecDeque::from(vec![x.clone(); self.b.len()]);
            self.y_queue = VecDeque::from(vec![x.clone(); self.a.len() - 1]);
            self.y = x.clone();
            self.primed = true;
        }

        if check_modulo {
            for c in self.angular_indices() {
                x[c] = self.y[c] + get_ang_dist_pi(self.y[c], x[c]);
            }
        }

        self.x_queue.pop_back();
        self.x_queue.push_front(x);

        let mut y = DVector::zeros(self.num_channels);
        for (b, xi) in self.b.iter().zip(self.x_queue.iter()) {
            y += xi * *b;
        }
        for (a, yj) in self.a.iter().skip(1).zip(self.y_queue.iter()) {
            y -= yj * *a;
        }

        if check_modulo {
            for c in self.angular_indices() {
                let wrapped = wrap_to_pi(y[c]);
                let delta = wrapped - y[c];

                if delta != 0.0 {
                    trace!("Filter channel {} wrapped by {:.4}", c, delta);

                    // Keep the history on the same branch as the output
                    for h in self.x_queue.iter_mut().chain(self.y_queue.iter_mut()) {
                        h[c] += delta;
                    }
                    y[c] = wrapped;
                    self.report.num_wraps += 1;
                }
            }
        }

        if !self.y_queue.is_empty() {
            self.y_queue.pop_back();
            self.y_queue.push_front(y.clone());
        }

        self.y = y.clone();
        self.report.num_samples += 1;

        Ok(y)
    }

    /// The last output.
    pub fn value(&self) -> Result<&DVector<f64>, FilterError> {
        if !self.initialised {
            return Err(FilterError::NotInitialised);
        }
        Ok(&self.y)
    }

    /// Number of channels, 0 before initialisation.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    fn angular_indices(&self) -> Vec<usize> {
        self.angular
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(c, _)| c)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn single_angle(alpha: f64) -> PeriodicFilter {
        let mut f = PeriodicFilter::new();
        f.initialize_with_coefficients(1, vec![alpha], vec![1.0, -(1.0 - alpha)], &[0])
            .unwrap();
        f
    }

    fn sample(v: f64) -> DVector<f64> {
        DVector::from_element(1, v)
    }

    #[test]
    fn test_not_initialised() {
        let mut f = PeriodicFilter::new();
        assert!(matches!(f.filter(&sample(0.0), true), Err(FilterError::NotInitialised)));
        assert!(matches!(f.value(), Err(FilterError::NotInitialised)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut f = PeriodicFilter::new();
        f.initialize(&Params::default()).unwrap();
        assert!(matches!(
            f.filter(&DVector::zeros(5), false),
            Err(FilterError::DimensionMismatch { expected: 6, found: 5 })
        ));
    }

    #[test]
    fn test_bad_coefficients() {
        let mut f = PeriodicFilter::new();
        assert!(f.initialize_with_coefficients(1, vec![], vec![1.0], &[]).is_err());
        assert!(f.initialize_with_coefficients(1, vec![1.0], vec![0.0, 1.0], &[]).is_err());
        assert!(f.initialize_with_coefficients(2, vec![1.0], vec![1.0], &[2]).is_err());
        assert!(f.initialize_with_coefficients(0, vec![1.0], vec![1.0], &[]).is_err());
    }

    #[test]
    fn test_crossing_pi() {
        let mut f = single_angle(0.5);

        let mut prev = f.filter(&sample(3.0), true).unwrap()[0];
        assert_relative_eq!(prev, 3.0);

        for &x in &[3.1, -3.1, -3.0] {
            let y = f.filter(&sample(x), true).unwrap()[0];
            assert!(y > -PI && y <= PI);
            assert!(get_ang_dist_pi(prev, y).abs() < 0.2);
            prev = y;
        }

        // Last output lies between the last two inputs, across the boundary
        assert!(prev < -3.0 && prev > -3.2);
        assert_eq!(f.report().num_wraps, 1);
    }

    #[test]
    fn test_crossing_pi_without_modulo() {
        let mut f = single_angle(0.5);
        f.filter(&sample(3.0), false).unwrap();
        f.filter(&sample(3.1), false).unwrap();
        let y = f.filter(&sample(-3.1), false).unwrap()[0];

        // Linear filtering averages through zero
        assert!(y.abs() < 0.1);
    }

    #[test]
    fn test_constant_converges() {
        let mut f = PeriodicFilter::new();
        f.initialize(&Params {
            cutoff_hz: 5.0,
            ..Params::default()
        })
        .unwrap();

        let target = DVector::from_vec(vec![0.3, -0.2, 0.28, 0.1, -0.05, 3.1]);

        // Start far away, then feed the constant
        f.filter(&DVector::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, -3.1]), true)
            .unwrap();
        let mut y = DVector::zeros(6);
        for _ in 0..5000 {
            y = f.filter(&target, true).unwrap();
        }

        assert_relative_eq!(y, target, epsilon = 1e-6);
        assert_relative_eq!(f.value().unwrap().clone(), target, epsilon = 1e-6);
    }

    #[test]
    fn test_first_sample_passes_through() {
        let mut f = PeriodicFilter::new();
        f.initialize(&Params::default()).unwrap();

        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, 0.5, 0.0, 4.0]);
        let y = f.filter(&x, true).unwrap();

        assert_relative_eq!(y[0], 1.0);
        assert_relative_eq!(y[2], 3.0);
        // Angular channel wrapped into range
        assert_relative_eq!(y[5], 4.0 - 2.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut f = single_angle(0.1);
        f.filter(&sample(1.0), false).unwrap();
        f.filter(&sample(2.0), false).unwrap();
        f.reset();
        assert_eq!(f.report().num_samples, 0);
        assert_relative_eq!(f.filter(&sample(-1.0), false).unwrap()[0], -1.0);
    }

    #[test]
    fn test_second_order() {
        // Moving average of two samples
        let mut f = PeriodicFilter::new();
        f.initialize_with_coefficients(1, vec![0.5, 0.5], vec![1.0], &[]).unwrap();
        f.filter(&sample(0.0), false).unwrap();
        assert_relative_eq!(f.filter(&sample(2.0), false).unwrap()[0], 1.0);
        assert_relative_eq!(f.filter(&sample(2.0), false).unwrap()[0], 2.0);
    }

    proptest! {
        #[test]
        fn test_angular_steps_bounded(
            start in -PI..PI,
            steps in proptest::collection::vec(-0.5f64..0.5, 1..200),
        ) {
            let alpha = 0.3;
            let mut f = single_angle(alpha);

            let mut x = start;
            let mut prev = f.filter(&sample(x), true).unwrap()[0];

            for s in steps {
                x = wrap_to_pi(x + s);
                let y = f.filter(&sample(x), true).unwrap()[0];

                prop_assert!(y > -PI && y <= PI);
                prop_assert!(get_ang_dist_pi(prev, y).abs() <= alpha * PI + 1e-9);
                prev = y;
            }
        }
    }
}
