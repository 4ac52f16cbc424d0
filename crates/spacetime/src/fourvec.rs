//! Small helpers on 4-vectors and their spatial parts.

use nalgebra::{Vector3, Vector4};

/// Spatial part of a 4-vector.
pub fn spatial(v: &Vector4<f64>) -> Vector3<f64> {
    Vector3::new(v[0], v[1], v[2])
}

/// Coordinate radius of a 4-position.
pub fn radius(x: &Vector4<f64>) -> f64 {
    (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt()
}

/// Flat-space dot product of the spatial parts of two 4-vectors.
pub fn dot3(a: &Vector4<f64>, b: &Vector4<f64>) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Normalize a spatial 3-vector in place to unit flat-space length.
pub fn normalize3(v: &mut Vector3<f64>) {
    let norm = v.norm();
    debug_assert!(norm > 0.0);
    *v /= norm;
}

/// Assemble a 4-vector from a spatial part and a time component.
pub fn with_time(spatial: &Vector3<f64>, time: f64) -> Vector4<f64> {
    Vector4::new(spatial[0], spatial[1], spatial[2], time)
}
