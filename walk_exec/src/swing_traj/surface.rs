//! Supporting surfaces for footsteps

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use super::SwingTrajError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planar surface a foot can land on.
///
/// The plane is `z = a*x + b*y + c`. The surface is bounded by a convex
/// polygon in the x/y plane, or unbounded if there are no vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Plane coefficients `[a, b, c]`.
    pub plane_coeffs: [f64; 3],

    /// Vertices of the bounding polygon, in order.
    ///
    /// Units: meters,
    /// Frame: World
    pub vertices_m: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Surface {
    /// An unbounded horizontal surface at the given height.
    pub fn flat(height_m: f64) -> Self {
        Self {
            plane_coeffs: [0.0, 0.0, height_m],
            vertices_m: Vec::new(),
        }
    }

    /// Check the surface is usable.
    pub fn validate(&self) -> Result<(), SwingTrajError> {
        if self.plane_coeffs.iter().any(|c| !c.is_finite()) {
            return Err(SwingTrajError::InvalidConfig(
                "surface plane coefficients must be finite".into(),
            ));
        }
        if !self.vertices_m.is_empty() && self.vertices_m.len() < 3 {
            return Err(SwingTrajError::InvalidConfig(format!(
                "a bounded surface needs at least 3 vertices, found {}",
                self.vertices_m.len()
            )));
        }
        if self.vertices_m.iter().flatten().any(|v| !v.is_finite()) {
            return Err(SwingTrajError::InvalidConfig(
                "surface vertices must be finite".into(),
            ));
        }

        Ok(())
    }

    /// Height of the plane at a point.
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        let [a, b, c] = self.plane_coeffs;
        a * x + b * y + c
    }

    /// True if the point lies inside (or on the edge of) the polygon.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.vertices_m.is_empty() {
            return true;
        }

        let p = Vector2::new(x, y);
        let mut sign = 0.0;

        for (a, b) in self.edges() {
            let cross = (b - a).perp(&(p - a));
            if cross == 0.0 {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }

        true
    }

    /// Project a point onto the surface.
    ///
    /// Points outside the polygon are moved to the closest point on its
    /// boundary, then the height is taken from the plane.
    pub fn project(&self, point_m: &Vector3<f64>) -> Vector3<f64> {
        let mut xy = Vector2::new(point_m.x, point_m.y);

        if !self.contains(xy.x, xy.y) {
            let mut best = xy;
            let mut best_dist = f64::INFINITY;

            for (a, b) in self.edges() {
                let q = closest_on_segment(&a, &b, &xy);
                let d = (q - xy).norm_squared();
                if d < best_dist {
                    best_dist = d;
                    best = q;
                }
            }

            xy = best;
        }

        Vector3::new(xy.x, xy.y, self.height_at(xy.x, xy.y))
    }

    fn edges(&self) -> impl Iterator<Item = (Vector2<f64>, Vector2<f64>)> + '_ {
        let n = self.vertices_m.len();
        (0..n).map(move |i| {
            let a = self.vertices_m[i];
            let b = self.vertices_m[(i + 1) % n];
            (Vector2::new(a[0], a[1]), Vector2::new(b[0], b[1]))
        })
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

fn closest_on_segment(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> Vector2<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return *a;
    }

    let t = ((p - a).dot(&ab) / len_sq).max(0.0).min(1.0);
    a + ab * t
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Surface {
        Surface {
            plane_coeffs: [0.1, 0.0, 0.05],
            vertices_m: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        }
    }

    #[test]
    fn test_contains() {
        let s = square();
        assert!(s.contains(0.5, 0.5));
        assert!(s.contains(1.0, 0.5));
        assert!(!s.contains(1.5, 0.5));
        assert!(!s.contains(-0.1, -0.1));
        assert!(Surface::flat(0.0).contains(100.0, -100.0));
    }

    #[test]
    fn test_project() {
        let s = square();

        let inside = s.project(&Vector3::new(0.5, 0.25, 3.0));
        assert_relative_eq!(inside, Vector3::new(0.5, 0.25, 0.1 * 0.5 + 0.05));

        let outside = s.project(&Vector3::new(2.0, 0.5, 0.0));
        assert_relative_eq!(outside, Vector3::new(1.0, 0.5, 0.15));

        let corner = s.project(&Vector3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(corner, Vector3::new(0.0, 0.0, 0.05));

        let flat = Surface::flat(0.02).project(&Vector3::new(3.0, 4.0, -1.0));
        assert_relative_eq!(flat, Vector3::new(3.0, 4.0, 0.02));
    }

    #[test]
    fn test_validate() {
        assert!(square().validate().is_ok());
        let mut s = square();
        s.vertices_m.truncate(2);
        assert!(s.validate().is_err());
    }
}
