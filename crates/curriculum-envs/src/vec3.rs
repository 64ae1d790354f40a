//! Small 3-vector helpers for derived-quantity math

/// Cartesian point or vector
pub type Vec3 = [f64; 3];

/// `a - b`
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean norm
pub fn norm(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Euclidean norm of the xy components only
pub fn norm_xy(v: Vec3) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

/// `a + s * b`
pub fn add_scaled(a: Vec3, b: Vec3, s: f64) -> Vec3 {
    [a[0] + s * b[0], a[1] + s * b[1], a[2] + s * b[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_of_unit_axes() {
        assert_eq!(norm([1.0, 0.0, 0.0]), 1.0);
        assert!((norm([1.0, 2.0, 2.0]) - 3.0).abs() < 1e-12);
        assert!((norm_xy([3.0, 4.0, 100.0]) - 5.0).abs() < 1e-12);
    }
}
