//! 3+1 metric at a spacetime point.
//!
//! The metric is stored in its 3+1 split: lapse α, shift βⁱ, and spatial
//! 3-metric γᵢⱼ, assembled into the full covariant g_μν on construction.
//! With the (+, +, +, −) signature and the time component in slot 3:
//!
//! ```text
//! g_tt = −α² + γᵢⱼ βⁱ βʲ      g_ti = γᵢⱼ βʲ      g_ij = γᵢⱼ
//! ```
//!
//! All grids in this crate use a vanishing shift.

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};

/// Connection coefficients Γᵃ_μν indexed `[a][mu][nu]`.
pub type Christoffel = [[[f64; 4]; 4]; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Lapse α
    pub alpha: f64,
    /// Shift vector βⁱ (upper index)
    pub betaup: Vector3<f64>,
    /// Spatial 3-metric γᵢⱼ (lower indices)
    pub gammalow: Matrix3<f64>,
    /// Assembled covariant metric g_μν
    glow: Matrix4<f64>,
}

impl Metric {
    pub fn new(alpha: f64, betaup: Vector3<f64>, gammalow: Matrix3<f64>) -> Self {
        debug_assert!(alpha > 0.0);

        let betalow = gammalow * betaup;
        let mut glow = Matrix4::zeros();
        for i in 0..3 {
            for j in 0..3 {
                glow[(i, j)] = gammalow[(i, j)];
            }
            glow[(i, 3)] = betalow[i];
            glow[(3, i)] = betalow[i];
        }
        glow[(3, 3)] = -alpha * alpha + betaup.dot(&betalow);

        Self {
            alpha,
            betaup,
            gammalow,
            glow,
        }
    }

    /// Flat spacetime.
    pub fn minkowski() -> Self {
        Self::new(1.0, Vector3::zeros(), Matrix3::identity())
    }

    /// Full 4-metric contraction g_μν aᵘ bᵛ.
    pub fn dot4(&self, a: &Vector4<f64>, b: &Vector4<f64>) -> f64 {
        a.dot(&(self.glow * b))
    }

    /// Spatial contraction γᵢⱼ aⁱ bʲ of the spatial parts.
    pub fn dot3(&self, a: &Vector4<f64>, b: &Vector4<f64>) -> f64 {
        let mut sum = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                sum += self.gammalow[(i, j)] * a[i] * b[j];
            }
        }
        sum
    }

    /// Contraction of a 4-vector with the unit normal observer,
    /// n_μ = (0, 0, 0, −α). Negative for future-pointing vectors; for a
    /// wavevector, `-ndot(k)·c/2π` is the frequency seen by a normal
    /// observer.
    pub fn ndot(&self, k: &Vector4<f64>) -> f64 {
        -self.alpha * k[3]
    }

    /// Adjust the time component of `k` so that g(k, k) = 0, keeping the
    /// spatial components fixed. Requires a vanishing shift.
    pub fn normalize_null(&self, k: &mut Vector4<f64>) {
        debug_assert!(self.betaup.norm() == 0.0);
        let space = self.dot3(k, k);
        debug_assert!(space > 0.0);
        k[3] = space.sqrt() / self.alpha;
    }

    /// Residual of the null condition, |g(k,k)|/(k⁰)², for invariant checks.
    pub fn null_residual(&self, k: &Vector4<f64>) -> f64 {
        self.dot4(k, k).abs() / (k[3] * k[3])
    }
}
