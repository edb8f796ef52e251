//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Apply polynomial coefficients to a value.
///
/// Coefficients are ordered highest power first, so `[a, b, c]` evaluates
/// `a*x^2 + b*x + c`. Evaluated with Horner's method.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    coeffs.iter().fold(T::zero(), |acc, &c| acc * value + c)
}

/// Coefficients of the derivative of a polynomial, highest power first.
///
/// The derivative of a constant is the empty polynomial, which `poly_val`
/// evaluates to zero.
pub fn poly_deriv<T>(coeffs: &[T]) -> Vec<T>
where
    T: Float
{
    let n = coeffs.len();
    if n < 2 {
        return Vec::new();
    }

    coeffs[..n - 1]
        .iter()
        .enumerate()
        .map(|(i, &c)| c * T::from(n - 1 - i).unwrap_or_else(T::zero))
        .collect()
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_to_pi<T>(value: T) -> T
where
    T: Float
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    value - tau_t * ((value - pi_t) / tau_t).ceil()
}

/// Get the shortest signed angular distance from `a` to `b`.
///
/// The result lies in (-pi, pi] and satisfies `a + dist == b (mod 2pi)`.
pub fn get_ang_dist_pi<T>(a: T, b: T) -> T
where
    T: Float
{
    wrap_to_pi(b - a)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const TAU: f64 = std::f64::consts::TAU;
    const PI: f64 = std::f64::consts::PI;

    #[test]
    fn test_wrap_to_pi() {
        assert_relative_eq!(wrap_to_pi(0.0), 0.0);
        assert_relative_eq!(wrap_to_pi(PI), PI);
        assert_relative_eq!(wrap_to_pi(-PI), PI);
        assert_relative_eq!(wrap_to_pi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_to_pi(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_to_pi(5.0 * TAU + 0.25), 0.25, epsilon = 1e-12);

        for i in -100..100 {
            let w = wrap_to_pi(i as f64 * 0.37);
            assert!(w > -PI && w <= PI, "{} wrapped to {}", i as f64 * 0.37, w);
        }
    }

    #[test]
    fn test_get_ang_dist_pi() {
        assert_relative_eq!(get_ang_dist_pi(3.1, -3.1), TAU - 6.2, epsilon = 1e-12);
        assert_relative_eq!(get_ang_dist_pi(-3.1, 3.1), -(TAU - 6.2), epsilon = 1e-12);
        assert_relative_eq!(get_ang_dist_pi(0.5, 1.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_poly() {
        // 2x^2 - 3x + 1
        let coeffs = [2.0, -3.0, 1.0];
        assert_eq!(poly_val(0.0, &coeffs), 1.0);
        assert_eq!(poly_val(2.0, &coeffs), 3.0);

        let d = poly_deriv(&coeffs);
        assert_eq!(d, vec![4.0, -3.0]);
        assert_eq!(poly_val(1.0, &d), 1.0);

        assert!(poly_deriv(&[5.0]).is_empty());
        assert_eq!(poly_val(3.0, &poly_deriv(&[5.0])), 0.0);
    }
}
