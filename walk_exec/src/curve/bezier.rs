//! Bezier swing curves

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use super::{check_duration, CurveError, CurveSample, StartState, SwingCurve};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lowest degree a swing template can be built with. Three points are fixed
/// at each end, leaving at least one free point to shape the apex.
pub const MIN_SWING_DEGREE: usize = 6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A Bezier curve in 3D with a fixed duration.
#[derive(Debug, Clone)]
pub struct BezierCurve {
    points: Vec<Vector3<f64>>,

    /// Units: seconds
    duration_s: f64,

    /// Hodographs of the curve, already scaled by the degree factors but not
    /// by the duration. `hodographs[0]` gives the first derivative.
    hodographs: [Vec<Vector3<f64>>; 3],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BezierCurve {
    /// Create a new curve from its control points.
    ///
    /// The number of points must be `degree + 1`.
    pub fn new(
        points: Vec<Vector3<f64>>,
        degree: usize,
        duration_s: f64,
    ) -> Result<Self, CurveError> {
        if degree == 0 {
            return Err(CurveError::InvalidConfig(
                "Bezier degree must be at least 1".into(),
            ));
        }
        if points.len() != degree + 1 {
            return Err(CurveError::InvalidConfig(format!(
                "a degree {} Bezier curve needs {} control points, found {}",
                degree,
                degree + 1,
                points.len()
            )));
        }
        if points.iter().any(|p| !p.iter().all(|v| v.is_finite())) {
            return Err(CurveError::InvalidConfig(
                "Bezier control points must be finite".into(),
            ));
        }
        check_duration(duration_s)?;

        let first = hodograph(&points);
        let second = hodograph(&first);
        let third = hodograph(&second);

        Ok(Self {
            points,
            duration_s,
            hodographs: [first, second, third],
        })
    }

    /// Build the swing template from a start state to a touchdown point.
    ///
    /// The first three points reproduce the start position, velocity and
    /// acceleration, the last three coincide with the touchdown point so the
    /// foot lands with zero velocity and acceleration. Interior points are
    /// spread linearly in x/y; their shared height is chosen so the curve
    /// reaches `apex_m` at `s = 0.5`. Without an apex the interior heights
    /// are spread like x/y.
    pub fn swing(
        start: &StartState,
        touchdown_m: &Vector3<f64>,
        duration_s: f64,
        apex_m: Option<f64>,
        degree: usize,
    ) -> Result<Self, CurveError> {
        if degree < MIN_SWING_DEGREE {
            return Err(CurveError::InvalidConfig(format!(
                "swing Bezier curves need a degree of at least {}, found {}",
                MIN_SWING_DEGREE, degree
            )));
        }
        check_duration(duration_s)?;

        let n = degree as f64;
        let t = duration_s;

        let p0 = start.position_m;
        let p1 = p0 + start.velocity_ms * t / n;
        let p2 = 2.0 * p1 - p0 + start.acceleration_mss * t * t / (n * (n - 1.0));

        let mut points = vec![*touchdown_m; degree + 1];
        points[0] = p0;
        points[1] = p1;
        points[2] = p2;

        // Interior points, indices 3..=n-3
        let span = (degree - 4) as f64;
        for i in 3..=(degree - 3) {
            let f = (i - 2) as f64 / span;
            points[i] = p2 + (touchdown_m - p2) * f;
        }

        if let Some(apex_m) = apex_m {
            // Height at s = 0.5 is linear in the shared interior height h:
            // z(0.5) = fixed + h * weight
            let mut fixed = 0.0;
            let mut weight = 0.0;
            for (i, p) in points.iter().enumerate() {
                let b = bernstein(degree, i, 0.5);
                if (3..=(degree - 3)).contains(&i) {
                    weight += b;
                } else {
                    fixed += b * p.z;
                }
            }

            let h = (apex_m - fixed) / weight;
            for p in points.iter_mut().take(degree - 2).skip(3) {
                p.z = h;
            }
        }

        Self::new(points, degree, duration_s)
    }
}

impl SwingCurve for BezierCurve {
    fn sample(&self, s: f64) -> CurveSample {
        let s = s.max(0.0).min(1.0);
        let t = self.duration_s;

        CurveSample {
            position_m: de_casteljau(&self.points, s),
            velocity_ms: de_casteljau(&self.hodographs[0], s) / t,
            acceleration_mss: de_casteljau(&self.hodographs[1], s) / (t * t),
            jerk_msss: de_casteljau(&self.hodographs[2], s) / (t * t * t),
        }
    }

    fn duration_s(&self) -> f64 {
        self.duration_s
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Evaluate a Bezier curve with de Casteljau's algorithm.
///
/// The `a*(1-s) + b*s` form returns the end points exactly at `s = 0` and
/// `s = 1`. An empty point list evaluates to zero.
fn de_casteljau(points: &[Vector3<f64>], s: f64) -> Vector3<f64> {
    if points.is_empty() {
        return Vector3::zeros();
    }

    let mut work = points.to_vec();
    for k in 1..points.len() {
        for i in 0..(points.len() - k) {
            work[i] = work[i] * (1.0 - s) + work[i + 1] * s;
        }
    }
    work[0]
}

/// Control points of the derivative curve: `n * (P[i+1] - P[i])`.
///
/// The derivative of a constant (single point) is the empty curve.
fn hodograph(points: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    if points.len() < 2 {
        return Vec::new();
    }

    let n = (points.len() - 1) as f64;
    points.windows(2).map(|w| (w[1] - w[0]) * n).collect()
}

/// Bernstein basis polynomial `B_{i,n}(s)`.
fn bernstein(n: usize, i: usize, s: f64) -> f64 {
    binomial(n, i) * s.powi(i as i32) * (1.0 - s).powi((n - i) as i32)
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, j| acc * (n - j) as f64 / (j + 1) as f64)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn start() -> StartState {
        StartState {
            position_m: Vector3::new(0.2, -0.1, 0.0),
            velocity_ms: Vector3::new(0.3, 0.1, 0.2),
            acceleration_mss: Vector3::new(-1.0, 2.0, 4.0),
        }
    }

    #[test]
    fn test_degree_mismatch() {
        let pts = vec![Vector3::zeros(); 5];
        assert!(BezierCurve::new(pts.clone(), 6, 0.3).is_err());
        assert!(BezierCurve::new(pts.clone(), 4, 0.0).is_err());
        assert!(BezierCurve::new(pts, 4, 0.3).is_ok());
        assert!(BezierCurve::new(vec![Vector3::zeros()], 0, 0.3).is_err());
        assert!(BezierCurve::swing(&start(), &Vector3::zeros(), 0.3, None, 5).is_err());
    }

    #[test]
    fn test_exact_end_points() {
        let target = Vector3::new(0.35, -0.05, 0.02);
        let curve = BezierCurve::swing(&start(), &target, 0.3, Some(0.1), 6).unwrap();

        let s0 = curve.sample(0.0);
        assert_eq!(s0.position_m, start().position_m);
        assert_relative_eq!(s0.velocity_ms, start().velocity_ms, epsilon = 1e-12);
        assert_relative_eq!(s0.acceleration_mss, start().acceleration_mss, epsilon = 1e-9);

        let s1 = curve.sample(1.0);
        assert_eq!(s1.position_m, target);
        assert_relative_eq!(s1.velocity_ms, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(s1.acceleration_mss, Vector3::zeros(), epsilon = 1e-9);

        // Out of range parameters clamp to the ends
        assert_eq!(curve.sample(1.5).position_m, target);
        assert_eq!(curve.sample(-0.5).position_m, start().position_m);
    }

    #[test]
    fn test_apex() {
        let target = Vector3::new(0.1, 0.0, 0.0);
        for degree in 6..12 {
            let curve = BezierCurve::swing(
                &StartState::at_rest(Vector3::zeros()),
                &target,
                0.25,
                Some(0.08),
                degree,
            )
            .unwrap();
            assert_relative_eq!(curve.sample(0.5).position_m.z, 0.08, epsilon = 1e-12);
            assert_eq!(curve.points.len(), degree + 1);
        }
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let target = Vector3::new(0.35, -0.05, 0.02);
        let dur = 0.4;
        let curve = BezierCurve::swing(&start(), &target, dur, Some(0.12), 7).unwrap();

        let ds = 1e-6;
        let dt = ds * dur;
        for &s in &[0.1, 0.33, 0.5, 0.8] {
            let a = curve.sample(s - ds);
            let b = curve.sample(s + ds);
            let m = curve.sample(s);

            let vel = (b.position_m - a.position_m) / (2.0 * dt);
            let acc = (b.velocity_ms - a.velocity_ms) / (2.0 * dt);
            let jerk = (b.acceleration_mss - a.acceleration_mss) / (2.0 * dt);

            assert_relative_eq!(m.velocity_ms, vel, epsilon = 1e-5);
            assert_relative_eq!(m.acceleration_mss, acc, epsilon = 1e-4);
            assert_relative_eq!(m.jerk_msss, jerk, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_duration_scaling() {
        let pts = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ];
        let fast = BezierCurve::new(pts.clone(), 1, 0.5).unwrap();
        let slow = BezierCurve::new(pts, 1, 2.0).unwrap();

        assert_relative_eq!(fast.sample(0.3).velocity_ms.x, 2.0);
        assert_relative_eq!(slow.sample(0.3).velocity_ms.x, 0.5);

        // Derivatives above the degree vanish
        assert_eq!(fast.sample(0.3).acceleration_mss, Vector3::zeros());
        assert_eq!(fast.sample(0.3).jerk_msss, Vector3::zeros());
    }
}
