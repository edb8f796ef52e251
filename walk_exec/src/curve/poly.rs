//! Polynomial swing curves

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use util::maths::{poly_deriv, poly_val};

use super::{check_duration, CurveError, CurveSample, StartState, SwingCurve};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Coefficients of `64 s^3 (1 - s)^3`, highest power first. Equal to 1 at
/// `s = 0.5`, with zero value, velocity and acceleration at both ends.
const APEX_BUMP: [f64; 7] = [-64.0, 192.0, -192.0, 64.0, 0.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A curve made of one polynomial in `s` per axis.
#[derive(Debug, Clone)]
pub struct PolynomialCurve {
    /// Per axis coefficients, highest power first, followed by the
    /// coefficients of the first three derivatives.
    coeffs: [[Vec<f64>; 4]; 3],

    /// Units: seconds
    duration_s: f64,

    /// Start state and touchdown point of a swing curve, returned exactly at
    /// the ends.
    ends: Option<(StartState, Vector3<f64>)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PolynomialCurve {
    /// Create a curve from per axis coefficients (highest power first).
    pub fn new(coeffs: [Vec<f64>; 3], duration_s: f64) -> Result<Self, CurveError> {
        check_duration(duration_s)?;

        if coeffs.iter().any(|c| c.is_empty()) {
            return Err(CurveError::InvalidConfig(
                "each axis needs at least one polynomial coefficient".into(),
            ));
        }
        if coeffs.iter().flatten().any(|c| !c.is_finite()) {
            return Err(CurveError::InvalidConfig(
                "polynomial coefficients must be finite".into(),
            ));
        }

        let [x, y, z] = coeffs;
        let axis = |c: Vec<f64>| {
            let d1 = poly_deriv(&c);
            let d2 = poly_deriv(&d1);
            let d3 = poly_deriv(&d2);
            [c, d1, d2, d3]
        };

        Ok(Self {
            coeffs: [axis(x), axis(y), axis(z)],
            duration_s,
            ends: None,
        })
    }

    /// Build a swing curve from a start state to a touchdown point.
    ///
    /// Each axis is the quintic meeting the start position, velocity and
    /// acceleration at `s = 0` and resting at the touchdown point at
    /// `s = 1`. If `apex_m` is given a symmetric bump is added to the height
    /// so it passes through the apex at `s = 0.5`.
    pub fn swing(
        start: &StartState,
        touchdown_m: &Vector3<f64>,
        duration_s: f64,
        apex_m: Option<f64>,
    ) -> Result<Self, CurveError> {
        check_duration(duration_s)?;

        let t = duration_s;
        let mut axes: [Vec<f64>; 3] = Default::default();

        for (i, axis) in axes.iter_mut().enumerate() {
            *axis = quintic(
                start.position_m[i],
                start.velocity_ms[i] * t,
                start.acceleration_mss[i] * t * t,
                touchdown_m[i],
            );
        }

        if let Some(apex_m) = apex_m {
            let gain = apex_m - poly_val(0.5, &axes[2]);

            // Pad the quintic up to the bump's degree and add
            let mut z = vec![0.0; APEX_BUMP.len() - axes[2].len()];
            z.extend_from_slice(&axes[2]);
            for (c, b) in z.iter_mut().zip(APEX_BUMP.iter()) {
                *c += gain * b;
            }
            axes[2] = z;
        }

        let mut curve = Self::new(axes, duration_s)?;
        curve.ends = Some((*start, *touchdown_m));
        Ok(curve)
    }
}

impl SwingCurve for PolynomialCurve {
    fn sample(&self, s: f64) -> CurveSample {
        let s = s.max(0.0).min(1.0);
        let t = self.duration_s;

        let eval = |order: usize| {
            Vector3::new(
                poly_val(s, &self.coeffs[0][order]),
                poly_val(s, &self.coeffs[1][order]),
                poly_val(s, &self.coeffs[2][order]),
            )
        };

        let jerk_msss = eval(3) / (t * t * t);

        // Horner sums drift by a few ulps at the ends
        match self.ends {
            Some((ref start, _)) if s <= 0.0 => CurveSample {
                position_m: start.position_m,
                velocity_ms: start.velocity_ms,
                acceleration_mss: start.acceleration_mss,
                jerk_msss,
            },
            Some((_, touchdown_m)) if s >= 1.0 => CurveSample {
                position_m: touchdown_m,
                velocity_ms: Vector3::zeros(),
                acceleration_mss: Vector3::zeros(),
                jerk_msss,
            },
            _ => CurveSample {
                position_m: eval(0),
                velocity_ms: eval(1) / t,
                acceleration_mss: eval(2) / (t * t),
                jerk_msss,
            },
        }
    }

    fn duration_s(&self) -> f64 {
        self.duration_s
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Quintic in `s` with value `p0`, slope `v0` and curvature `a0` at `s = 0`
/// and value `p1` with zero slope and curvature at `s = 1`.
///
/// Returns coefficients highest power first.
fn quintic(p0: f64, v0: f64, a0: f64, p1: f64) -> Vec<f64> {
    let c0 = p0;
    let c1 = v0;
    let c2 = a0 / 2.0;

    // Residuals the cubic to quintic terms must take up at s = 1
    let h = p1 - c0 - c1 - c2;
    let v = -(c1 + 2.0 * c2);
    let a = -2.0 * c2;

    let c3 = 10.0 * h - 4.0 * v + a / 2.0;
    let c4 = -15.0 * h + 7.0 * v - a;
    let c5 = 6.0 * h - 3.0 * v + a / 2.0;

    vec![c5, c4, c3, c2, c1, c0]
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_boundary_conditions() {
        let start = StartState {
            position_m: Vector3::new(0.1, 0.2, 0.0),
            velocity_ms: Vector3::new(0.5, -0.2, 0.3),
            acceleration_mss: Vector3::new(1.0, 0.0, -2.0),
        };
        let target = Vector3::new(0.3, 0.15, 0.05);
        let curve = PolynomialCurve::swing(&start, &target, 0.3, Some(0.12)).unwrap();

        let s0 = curve.sample(0.0);
        assert_eq!(s0.position_m, start.position_m);
        assert_relative_eq!(s0.velocity_ms, start.velocity_ms, epsilon = 1e-12);
        assert_relative_eq!(s0.acceleration_mss, start.acceleration_mss, epsilon = 1e-9);

        let s1 = curve.sample(1.0);
        assert_eq!(s1.position_m, target);
        assert_eq!(s1.velocity_ms, Vector3::zeros());
        assert_eq!(s1.acceleration_mss, Vector3::zeros());

        // Just inside the end the polynomial itself is close to rest
        let s1 = curve.sample(1.0 - 1e-9);
        assert_relative_eq!(s1.position_m, target, epsilon = 1e-9);
        assert_relative_eq!(s1.velocity_ms, Vector3::zeros(), epsilon = 1e-6);

        assert_relative_eq!(curve.sample(0.5).position_m.z, 0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_without_apex_is_quintic() {
        let curve = PolynomialCurve::swing(
            &StartState::at_rest(Vector3::zeros()),
            &Vector3::new(1.0, 0.0, 0.0),
            1.0,
            None,
        )
        .unwrap();

        // Minimum jerk profile: 10s^3 - 15s^4 + 6s^5
        assert_relative_eq!(curve.sample(0.5).position_m.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(curve.sample(0.5).velocity_ms.x, 1.875, epsilon = 1e-12);
        assert_eq!(curve.sample(0.5).position_m.z, 0.0);
    }

    #[test]
    fn test_exact_touchdown() {
        for i in 0..50 {
            let f = i as f64;
            let start = StartState {
                position_m: Vector3::new(0.01 * f, -0.003 * f, 0.001 * f),
                velocity_ms: Vector3::new(0.1 + 0.02 * f, -0.05, 0.07 * (f * 0.3).sin()),
                acceleration_mss: Vector3::new(-0.4, 0.013 * f, 0.9),
            };
            let target = Vector3::new(0.2 + 0.007 * f, 0.1 / (1.0 + f), 0.033 * (f * 0.7).cos());
            let curve =
                PolynomialCurve::swing(&start, &target, 0.1 + 0.011 * f, Some(0.08)).unwrap();

            assert_eq!(curve.sample(1.0).position_m, target);
            assert_eq!(curve.sample(1.5).position_m, target);
            assert_eq!(curve.sample(0.0).position_m, start.position_m);
            assert_eq!(curve.sample(0.0).velocity_ms, start.velocity_ms);
        }
    }

    #[test]
    fn test_invalid() {
        let rest = StartState::at_rest(Vector3::zeros());
        assert!(PolynomialCurve::swing(&rest, &Vector3::zeros(), -1.0, None).is_err());
        assert!(PolynomialCurve::new([vec![], vec![1.0], vec![1.0]], 1.0).is_err());
    }
}
