//! Spherically symmetric 1D grid.
//!
//! Zones are concentric shells. The metric is flat by default; supplying
//! per-zone lapse α and radial stretch X turns on the general-relativistic
//! mode with γᵢⱼ = δᵢⱼ + (X²−1)x̂ᵢx̂ⱼ and analytic connection coefficients
//! built from α, X and their radial slopes.

use nalgebra::{Matrix3, Vector3, Vector4};
use rand::Rng;
use rand_chacha::ChaChaRng;
use units::constants::C_LIGHT;
use units::{Density, Temperature};

use crate::axis::Axis;
use crate::fourvec;
use crate::grid::{interpolate_radial, Grid, TINY};
use crate::metric::{Christoffel, Metric};
use crate::tetrad::outward_hemisphere;

#[derive(Debug, Clone)]
pub struct Grid1DSphere {
    r_axis: Axis,
    rho: Vec<f64>,
    temp: Vec<f64>,
    ye: Vec<f64>,
    /// Radial fluid velocity at the bin centers (cm/s)
    vr: Vec<f64>,
    lapse: Vec<f64>,
    x_metric: Vec<f64>,
    dadr: Vec<f64>,
    dxdr: Vec<f64>,
    do_gr: bool,
    reflect_outer: bool,
}

impl Grid1DSphere {
    /// Flat-metric grid from per-zone fluid state.
    pub fn new(
        r_axis: Axis,
        rho: Vec<Density>,
        temp: Vec<Temperature>,
        ye: Vec<f64>,
        vr: Vec<f64>,
    ) -> Self {
        let n = r_axis.len();
        assert_eq!(rho.len(), n);
        assert_eq!(temp.len(), n);
        assert_eq!(ye.len(), n);
        assert_eq!(vr.len(), n);
        assert!(ye.iter().all(|&y| (0.0..=1.0).contains(&y)));

        Self {
            r_axis,
            rho: rho.iter().map(|r| r.to_grams_per_cm3()).collect(),
            temp: temp.iter().map(|t| t.to_kelvin()).collect(),
            ye,
            vr,
            lapse: vec![1.0; n],
            x_metric: vec![1.0; n],
            dadr: vec![0.0; n],
            dxdr: vec![0.0; n],
            do_gr: false,
            reflect_outer: false,
        }
    }

    /// Single-zone uniform sphere, the workhorse of the equilibrium tests.
    pub fn uniform(r_axis: Axis, rho: Density, temp: Temperature, ye: f64) -> Self {
        let n = r_axis.len();
        Self::new(
            r_axis,
            vec![rho; n],
            vec![temp; n],
            vec![ye; n],
            vec![0.0; n],
        )
    }

    /// Attach per-zone metric functions α and X, switching on GR mode.
    /// Slopes dα/dr and dX/dr are finite differences of the zone-center
    /// values, used by the connection coefficients.
    pub fn with_metric(mut self, lapse: Vec<f64>, x_metric: Vec<f64>) -> Self {
        let n = self.r_axis.len();
        assert_eq!(lapse.len(), n);
        assert_eq!(x_metric.len(), n);
        assert!(lapse.iter().all(|&a| a > 0.0 && a <= 1.0));
        assert!(x_metric.iter().all(|&x| x >= 1.0));

        self.dadr = slopes(&self.r_axis, &lapse);
        self.dxdr = slopes(&self.r_axis, &x_metric);
        self.lapse = lapse;
        self.x_metric = x_metric;
        self.do_gr = true;
        self
    }

    /// Reflect packets at the outer radial wall instead of letting them
    /// escape.
    pub fn with_reflecting_outer(mut self) -> Self {
        self.reflect_outer = true;
        self
    }

    pub fn r_axis(&self) -> &Axis {
        &self.r_axis
    }

    fn lapse_at(&self, r: f64) -> f64 {
        if self.do_gr {
            interpolate_radial(&self.r_axis, &self.lapse, r)
        } else {
            1.0
        }
    }

    fn x_at(&self, r: f64) -> f64 {
        if self.do_gr {
            interpolate_radial(&self.r_axis, &self.x_metric, r)
        } else {
            1.0
        }
    }
}

/// Finite-difference radial slopes of per-zone values at the bin centers.
fn slopes(axis: &Axis, values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 1 {
        return vec![0.0];
    }
    (0..n)
        .map(|i| {
            let (lo, hi) = if i == 0 {
                (0, 1)
            } else if i == n - 1 {
                (n - 2, n - 1)
            } else {
                (i - 1, i + 1)
            };
            (values[hi] - values[lo]) / (axis.mid[hi] - axis.mid[lo])
        })
        .collect()
}

impl Grid for Grid1DSphere {
    fn n_zones(&self) -> usize {
        self.r_axis.len()
    }

    fn spatial_axes(&self) -> Vec<Axis> {
        vec![self.r_axis.clone()]
    }

    fn zone_index(&self, x: &Vector4<f64>) -> Option<usize> {
        self.r_axis.bin(fourvec::radius(x))
    }

    fn zone_directional_indices(&self, z: usize) -> Vec<usize> {
        vec![z]
    }

    fn zone_min_length(&self, z: usize) -> f64 {
        self.r_axis.delta(z)
    }

    fn zone_cell_dist(&self, x: &Vector4<f64>, z: usize) -> f64 {
        let r = fourvec::radius(x);
        let dr_in = r - self.r_axis.bottom(z);
        let dr_out = self.r_axis.top[z] - r;
        dr_in.min(dr_out).max(0.0)
    }

    fn zone_lab_volume(&self, z: usize) -> f64 {
        let r0 = self.r_axis.bottom(z);
        let r1 = self.r_axis.top[z];
        let mut vol = 4.0 * std::f64::consts::PI / 3.0 * (r1.powi(3) - r0.powi(3));
        if self.do_gr {
            vol *= self.x_metric[z];
        }
        vol
    }

    fn zone_lorentz_factor(&self, z: usize) -> f64 {
        let x = self.x_metric[z];
        let vdotv = self.vr[z] * self.vr[z] * x * x / (C_LIGHT * C_LIGHT);
        1.0 / (1.0 - vdotv).sqrt()
    }

    fn zone_radius(&self, z: usize) -> f64 {
        self.r_axis.top[z]
    }

    fn sample_in_zone(&self, z: usize, rng: &mut ChaChaRng) -> Vector4<f64> {
        sample_shell(&self.r_axis, z, rng)
    }

    fn fluid_velocity(&self, x: &Vector4<f64>, _z: usize) -> Vector3<f64> {
        let r = fourvec::radius(x);
        if r == 0.0 {
            return Vector3::zeros();
        }
        let vr = interpolate_radial(&self.r_axis, &self.vr, r);
        fourvec::spatial(x) * (vr / r)
    }

    fn metric(&self, x: &Vector4<f64>) -> Metric {
        if !self.do_gr {
            return Metric::minkowski();
        }
        let r = fourvec::radius(x);
        let alpha = self.lapse_at(r);
        let xm = self.x_at(r);

        let mut gamma = Matrix3::identity();
        if r > 0.0 {
            let coeff = (xm * xm - 1.0) / (r * r);
            for i in 0..3 {
                for j in 0..3 {
                    gamma[(i, j)] += x[i] * x[j] * coeff;
                }
            }
        }
        Metric::new(alpha, Vector3::zeros(), gamma)
    }

    fn christoffel(&self, x: &Vector4<f64>) -> Christoffel {
        let r = fourvec::radius(x);
        let alpha = self.lapse_at(r);
        let xm = self.x_at(r);
        let dadr = interpolate_radial(&self.r_axis, &self.dadr, r);
        let dxdr = interpolate_radial(&self.r_axis, &self.dxdr, r);
        christoffel_radial(x, r, alpha, xm, dadr, dxdr)
    }

    fn do_gr(&self) -> bool {
        self.do_gr
    }

    fn reflect_boundaries(&self, x: &mut Vector4<f64>, k: &mut Vector4<f64>, tol: f64) {
        let rmax = self.r_axis.max();
        let r = fourvec::radius(x);
        if !self.reflect_outer || r <= rmax {
            return;
        }

        let dr = self.r_axis.delta(self.r_axis.len() - 1);
        debug_assert!((r - rmax).abs() < tol * dr);
        reflect_radial(x, k, r, rmax - TINY * dr, &self.metric(x));
        debug_assert!(self.zone_index(x).is_some());
    }

    fn random_core_x_d(&self, r_core: f64, rng: &mut ChaChaRng) -> (Vector4<f64>, Vector3<f64>) {
        sample_core_surface(r_core, rng)
    }

    fn rho(&self, z: usize) -> f64 {
        self.rho[z]
    }

    fn temp(&self, z: usize) -> f64 {
        self.temp[z]
    }

    fn ye(&self, z: usize) -> f64 {
        self.ye[z]
    }
}

/// Connection coefficients of the radial 3+1 metric
/// γᵢⱼ = δᵢⱼ + (X²−1)x̂ᵢx̂ⱼ, g_tt = −α², evaluated from α, X and their
/// radial slopes.
pub(crate) fn christoffel_radial(
    x: &Vector4<f64>,
    r: f64,
    alpha: f64,
    xm: f64,
    dadr: f64,
    dxdr: f64,
) -> Christoffel {
    let mut conn = [[[0.0; 4]; 4]; 4];
    if r == 0.0 {
        return conn;
    }
    let x2 = xm * xm;

    for a in 0..4 {
        for mu in 0..4 {
            for nu in 0..4 {
                conn[a][mu][nu] = if a == 3 {
                    match (mu, nu) {
                        (3, 3) => 0.0,
                        (_, 3) => dadr / (r * alpha) * x[mu],
                        (3, _) => dadr / (r * alpha) * x[nu],
                        _ => 0.0,
                    }
                } else if mu == 3 && nu == 3 {
                    alpha * dadr / (r * x2) * x[a]
                } else if mu == 3 || nu == 3 {
                    0.0
                } else {
                    let mut result = x[mu] * x[nu] / (r * r * r * x2) * (1.0 - x2 + r * xm * dxdr);
                    if mu == nu {
                        result -= (1.0 - x2) / (r * x2);
                    }
                    result * x[a] / r
                };
            }
        }
    }
    conn
}

/// Invert the radial component of the wavevector and deposit the position at
/// radius `r_new`, re-normalizing the wavevector to null.
pub(crate) fn reflect_radial(
    x: &mut Vector4<f64>,
    k: &mut Vector4<f64>,
    r: f64,
    r_new: f64,
    g: &Metric,
) {
    let kr = (x[0] * k[0] + x[1] * k[1] + x[2] * k[2]) / r;
    for i in 0..3 {
        k[i] -= 2.0 * kr * x[i] / r;
    }
    g.normalize_null(k);
    for i in 0..3 {
        x[i] *= r_new / r;
    }
}

/// Uniform-by-volume point within the shell `z` of a radial axis.
///
/// The radius comes from a probability integral transform (uniform in r³),
/// the angles are isotropic.
pub(crate) fn sample_shell(axis: &Axis, z: usize, rng: &mut ChaChaRng) -> Vector4<f64> {
    let r0 = axis.bottom(z);
    let r1 = axis.top[z];

    let u: f64 = rng.random();
    let radius = (u * (r1.powi(3) - r0.powi(3)) + r0.powi(3))
        .cbrt()
        .clamp(r0, r1);

    let mu: f64 = 1.0 - 2.0 * rng.random::<f64>();
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();

    Vector4::new(
        radius * sin_theta * phi.cos(),
        radius * sin_theta * phi.sin(),
        radius * mu,
        0.0,
    )
}

/// Uniform point on the sphere of radius `r_core` plus an outward direction
/// uniform in the forward hemisphere.
pub(crate) fn sample_core_surface(
    r_core: f64,
    rng: &mut ChaChaRng,
) -> (Vector4<f64>, Vector3<f64>) {
    debug_assert!(r_core > 0.0);
    let mu: f64 = 1.0 - 2.0 * rng.random::<f64>();
    let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
    let sin_theta = (1.0 - mu * mu).sqrt();

    let rhat = Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu);
    let x = fourvec::with_time(&(rhat * r_core), 0.0);
    let d = outward_hemisphere(&rhat, rng);
    (x, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn test_grid() -> Grid1DSphere {
        Grid1DSphere::uniform(
            Axis::new(1.0e5, 1.1e6, 10),
            Density::from_grams_per_cm3(1e12),
            Temperature::from_mev(10.0),
            0.3,
        )
    }

    #[test]
    fn zone_index_matches_radius() {
        let grid = test_grid();

        assert_eq!(grid.zone_index(&Vector4::new(1.5e5, 0.0, 0.0, 0.0)), Some(0));
        assert_eq!(grid.zone_index(&Vector4::new(0.0, 1.05e6, 0.0, 0.0)), Some(9));
        assert_eq!(grid.zone_index(&Vector4::new(5.0e4, 0.0, 0.0, 0.0)), None);
        assert_eq!(grid.zone_index(&Vector4::new(2.0e6, 0.0, 0.0, 0.0)), None);
    }

    #[test]
    fn sampled_positions_stay_in_zone() {
        let grid = test_grid();
        let mut rng = ChaChaRng::seed_from_u64(3);

        for z in 0..grid.n_zones() {
            for _ in 0..20 {
                let x = grid.sample_in_zone(z, &mut rng);
                assert_eq!(grid.zone_index(&x), Some(z));
            }
        }
    }

    #[test]
    fn cell_dist_vanishes_at_walls() {
        let grid = test_grid();
        let x = Vector4::new(grid.r_axis().top[3], 0.0, 0.0, 0.0);
        assert_relative_eq!(grid.zone_cell_dist(&x, 3), 0.0);

        let mid = grid.r_axis().mid[3];
        let xm = Vector4::new(mid, 0.0, 0.0, 0.0);
        assert_relative_eq!(grid.zone_cell_dist(&xm, 3), 0.5 * grid.r_axis().delta(3));
    }

    #[test]
    fn shell_volumes_sum_to_sphere_difference() {
        let grid = test_grid();
        let total: f64 = (0..grid.n_zones()).map(|z| grid.zone_lab_volume(z)).sum();
        let expected =
            4.0 * std::f64::consts::PI / 3.0 * ((1.1e6_f64).powi(3) - (1.0e5_f64).powi(3));
        assert_relative_eq!(total, expected, max_relative = 1e-12);
    }

    #[test]
    fn outer_reflection_inverts_radial_wavevector() {
        let grid = Grid1DSphere::uniform(
            Axis::new(0.0, 1.0e6, 4),
            Density::from_grams_per_cm3(1e10),
            Temperature::from_mev(5.0),
            0.3,
        )
        .with_reflecting_outer();

        // outgoing packet a hair past the outer wall
        let mut x = Vector4::new(1.0e6 + 1.0e-2, 0.0, 0.0, 0.0);
        let k0 = 1.0;
        let mut k = Vector4::new(k0, 0.0, 0.0, k0);

        grid.reflect_boundaries(&mut x, &mut k, 1.0);

        assert!(k[0] < 0.0, "radial component must invert");
        assert_relative_eq!(k[3], k0, epsilon = 1e-12);
        assert!(grid.zone_index(&x).is_some());
    }

    #[test]
    fn core_samples_sit_on_the_surface() {
        let grid = test_grid();
        let mut rng = ChaChaRng::seed_from_u64(11);
        let r_core = 2.0e5;

        for _ in 0..50 {
            let (x, d) = grid.random_core_x_d(r_core, &mut rng);
            assert_relative_eq!(fourvec::radius(&x), r_core, max_relative = 1e-12);
            // direction is outward
            let rhat = fourvec::spatial(&x) / r_core;
            assert!(d.dot(&rhat) >= 0.0);
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn static_fluid_has_unit_lorentz_factor() {
        let grid = test_grid();
        for z in 0..grid.n_zones() {
            assert_relative_eq!(grid.zone_lorentz_factor(z), 1.0);
        }
        let x = Vector4::new(5.0e5, 0.0, 0.0, 0.0);
        let u = grid.fluid_4velocity(&x, grid.zone_index(&x).unwrap());
        assert_relative_eq!(u[3], 1.0);
        assert_relative_eq!(u[0], 0.0);
    }
}
