//! Orthonormal tetrads and isotropic direction sampling.
//!
//! A tetrad is the local orthonormal frame of the fluid: its time leg is the
//! fluid 4-velocity and its three spatial legs are built by Gram–Schmidt
//! orthonormalization of the coordinate directions under the local metric.
//! Directional tallies and isotropic emission both live in this frame.

use nalgebra::{Vector3, Vector4};
use rand::Rng;
use rand_chacha::ChaChaRng;
use units::constants::C_LIGHT;

use crate::fourvec;
use crate::metric::Metric;

/// Local orthonormal basis: `e[0..3]` spatial legs, `e[3]` the time leg
/// (the fluid 4-velocity).
#[derive(Debug, Clone)]
pub struct Tetrad {
    pub e: [Vector4<f64>; 4],
}

impl Tetrad {
    /// Build the comoving tetrad for a fluid 4-velocity `u` under metric `g`.
    ///
    /// The spatial legs start from the coordinate unit vectors and are
    /// orthonormalized against the time leg and each other, so in flat space
    /// with a static fluid the tetrad is the coordinate basis itself.
    pub fn comoving(g: &Metric, u: &Vector4<f64>) -> Self {
        debug_assert!((g.dot4(u, u) + 1.0).abs() < 1e-6);

        let mut e = [
            Vector4::new(1.0, 0.0, 0.0, 0.0),
            Vector4::new(0.0, 1.0, 0.0, 0.0),
            Vector4::new(0.0, 0.0, 1.0, 0.0),
            *u,
        ];

        for a in 0..3 {
            let mut v = e[a];
            // project out the time leg (e₃·e₃ = −1)
            v += e[3] * g.dot4(&e[a], &e[3]);
            // project out the earlier spatial legs
            for b in 0..a {
                let proj = g.dot4(&v, &e[b]);
                v -= e[b] * proj;
            }
            let norm = g.dot4(&v, &v).sqrt();
            debug_assert!(norm > 0.0);
            e[a] = v / norm;
        }

        Self { e }
    }

    /// Components of a coordinate-frame 4-vector in the tetrad frame.
    pub fn coord_to_tetrad(&self, g: &Metric, v: &Vector4<f64>) -> Vector4<f64> {
        Vector4::new(
            g.dot4(&self.e[0], v),
            g.dot4(&self.e[1], v),
            g.dot4(&self.e[2], v),
            -g.dot4(&self.e[3], v),
        )
    }

    /// Coordinate-frame components of a tetrad-frame 4-vector.
    pub fn tetrad_to_coord(&self, v_tet: &Vector4<f64>) -> Vector4<f64> {
        self.e[0] * v_tet[0] + self.e[1] * v_tet[1] + self.e[2] * v_tet[2] + self.e[3] * v_tet[3]
    }
}

/// Sample a direction uniformly on the unit sphere.
pub fn isotropic_direction(rng: &mut ChaChaRng) -> Vector3<f64> {
    let mu: f64 = 1.0 - 2.0 * rng.random::<f64>();
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Sample a tetrad-frame null wavevector with comoving frequency `nu`:
/// uniform direction, magnitude 2πν/c.
pub fn isotropic_kup_tet(nu: f64, rng: &mut ChaChaRng) -> Vector4<f64> {
    debug_assert!(nu > 0.0);
    let k0 = nu * 2.0 * std::f64::consts::PI / C_LIGHT;
    let d = isotropic_direction(rng);
    fourvec::with_time(&(d * k0), k0)
}

/// Sample a direction uniformly in the hemisphere around `axis`
/// (μ = cos of the angle to `axis` uniform in [0, 1]).
pub fn outward_hemisphere(axis: &Vector3<f64>, rng: &mut ChaChaRng) -> Vector3<f64> {
    let mu: f64 = rng.random::<f64>();
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();
    let local = Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu);
    rotate_zhat_to(axis, &local)
}

/// Rotate a vector expressed relative to ẑ so that ẑ maps onto `axis`.
///
/// First rotates away from the z-axis in the x–z plane, then around z toward
/// the azimuth of `axis`.
pub fn rotate_zhat_to(axis: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    let cos_theta = axis[2];
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    if sin_theta < 1e-14 {
        // axis is ±ẑ: at most a sign flip
        return if cos_theta > 0.0 {
            *v
        } else {
            Vector3::new(v[0], v[1], -v[2])
        };
    }

    let rotated = Vector3::new(
        cos_theta * v[0] + sin_theta * v[2],
        v[1],
        -sin_theta * v[0] + cos_theta * v[2],
    );

    let cos_phi = axis[0] / sin_theta;
    let sin_phi = axis[1] / sin_theta;
    Vector3::new(
        cos_phi * rotated[0] - sin_phi * rotated[1],
        sin_phi * rotated[0] + cos_phi * rotated[1],
        rotated[2],
    )
}
