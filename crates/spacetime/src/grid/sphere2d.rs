//! Axisymmetric 2D spherical grid (r, θ).
//!
//! Zones are shell sectors; the zone index is `ir * nθ + iθ`. The metric is
//! flat; the fluid carries radial and polar velocity components.

use nalgebra::{Vector3, Vector4};
use rand::Rng;
use rand_chacha::ChaChaRng;
use units::constants::C_LIGHT;
use units::{Density, Temperature};

use crate::axis::Axis;
use crate::fourvec;
use crate::grid::sphere1d::{reflect_radial, sample_core_surface};
use crate::grid::{Grid, TINY};
use crate::metric::Metric;

#[derive(Debug, Clone)]
pub struct Grid2DSphere {
    r_axis: Axis,
    /// Polar angle axis, θ ∈ [0, π]
    theta_axis: Axis,
    rho: Vec<f64>,
    temp: Vec<f64>,
    ye: Vec<f64>,
    vr: Vec<f64>,
    vtheta: Vec<f64>,
    reflect_outer: bool,
}

impl Grid2DSphere {
    pub fn new(
        r_axis: Axis,
        theta_axis: Axis,
        rho: Vec<Density>,
        temp: Vec<Temperature>,
        ye: Vec<f64>,
        vr: Vec<f64>,
        vtheta: Vec<f64>,
    ) -> Self {
        let n = r_axis.len() * theta_axis.len();
        assert!(theta_axis.min >= 0.0 && theta_axis.max() <= std::f64::consts::PI + 1e-12);
        assert_eq!(rho.len(), n);
        assert_eq!(temp.len(), n);
        assert_eq!(ye.len(), n);
        assert_eq!(vr.len(), n);
        assert_eq!(vtheta.len(), n);

        Self {
            r_axis,
            theta_axis,
            rho: rho.iter().map(|r| r.to_grams_per_cm3()).collect(),
            temp: temp.iter().map(|t| t.to_kelvin()).collect(),
            ye,
            vr,
            vtheta,
            reflect_outer: false,
        }
    }

    /// Static uniform fluid over the whole wedge.
    pub fn uniform(
        r_axis: Axis,
        theta_axis: Axis,
        rho: Density,
        temp: Temperature,
        ye: f64,
    ) -> Self {
        let n = r_axis.len() * theta_axis.len();
        Self::new(
            r_axis,
            theta_axis,
            vec![rho; n],
            vec![temp; n],
            vec![ye; n],
            vec![0.0; n],
            vec![0.0; n],
        )
    }

    pub fn with_reflecting_outer(mut self) -> Self {
        self.reflect_outer = true;
        self
    }

    fn split(&self, z: usize) -> (usize, usize) {
        (z / self.theta_axis.len(), z % self.theta_axis.len())
    }

    fn theta_of(x: &Vector4<f64>, r: f64) -> f64 {
        if r == 0.0 {
            return 0.0;
        }
        (x[2] / r).clamp(-1.0, 1.0).acos()
    }
}

impl Grid for Grid2DSphere {
    fn n_zones(&self) -> usize {
        self.r_axis.len() * self.theta_axis.len()
    }

    fn spatial_axes(&self) -> Vec<Axis> {
        vec![self.r_axis.clone(), self.theta_axis.clone()]
    }

    fn zone_index(&self, x: &Vector4<f64>) -> Option<usize> {
        let r = fourvec::radius(x);
        let ir = self.r_axis.bin(r)?;
        let it = self.theta_axis.bin(Self::theta_of(x, r))?;
        Some(ir * self.theta_axis.len() + it)
    }

    fn zone_directional_indices(&self, z: usize) -> Vec<usize> {
        let (ir, it) = self.split(z);
        vec![ir, it]
    }

    fn zone_min_length(&self, z: usize) -> f64 {
        let (ir, it) = self.split(z);
        let dr = self.r_axis.delta(ir);
        let arc = self.r_axis.mid[ir] * self.theta_axis.delta(it);
        dr.min(arc)
    }

    fn zone_cell_dist(&self, x: &Vector4<f64>, z: usize) -> f64 {
        let (ir, it) = self.split(z);
        let r = fourvec::radius(x);
        let theta = Self::theta_of(x, r);

        let dr = (r - self.r_axis.bottom(ir)).min(self.r_axis.top[ir] - r);
        let dtheta = (theta - self.theta_axis.bottom(it)).min(self.theta_axis.top[it] - theta);
        dr.min(r * dtheta).max(0.0)
    }

    fn zone_lab_volume(&self, z: usize) -> f64 {
        let (ir, it) = self.split(z);
        let r0 = self.r_axis.bottom(ir);
        let r1 = self.r_axis.top[ir];
        let mu0 = self.theta_axis.bottom(it).cos();
        let mu1 = self.theta_axis.top[it].cos();
        2.0 * std::f64::consts::PI / 3.0 * (r1.powi(3) - r0.powi(3)) * (mu0 - mu1)
    }

    fn zone_lorentz_factor(&self, z: usize) -> f64 {
        let v2 = (self.vr[z] * self.vr[z] + self.vtheta[z] * self.vtheta[z]) / (C_LIGHT * C_LIGHT);
        1.0 / (1.0 - v2).sqrt()
    }

    fn zone_radius(&self, z: usize) -> f64 {
        let (ir, _) = self.split(z);
        self.r_axis.top[ir]
    }

    fn sample_in_zone(&self, z: usize, rng: &mut ChaChaRng) -> Vector4<f64> {
        let (ir, it) = self.split(z);
        let r0 = self.r_axis.bottom(ir);
        let r1 = self.r_axis.top[ir];

        let u: f64 = rng.random();
        let radius = (u * (r1.powi(3) - r0.powi(3)) + r0.powi(3))
            .cbrt()
            .clamp(r0, r1);

        // uniform in μ = cos θ within the sector
        let mu0 = self.theta_axis.bottom(it).cos();
        let mu1 = self.theta_axis.top[it].cos();
        let mu = mu0 + (mu1 - mu0) * rng.random::<f64>();
        let phi = 2.0 * std::f64::consts::PI * rng.random::<f64>();
        let sin_theta = (1.0 - mu * mu).sqrt();

        Vector4::new(
            radius * sin_theta * phi.cos(),
            radius * sin_theta * phi.sin(),
            radius * mu,
            0.0,
        )
    }

    fn fluid_velocity(&self, x: &Vector4<f64>, z: usize) -> Vector3<f64> {
        let r = fourvec::radius(x);
        if r == 0.0 {
            return Vector3::zeros();
        }
        let rhat = fourvec::spatial(x) / r;
        let theta = Self::theta_of(x, r);
        let phi = x[1].atan2(x[0]);
        let theta_hat = Vector3::new(
            theta.cos() * phi.cos(),
            theta.cos() * phi.sin(),
            -theta.sin(),
        );
        rhat * self.vr[z] + theta_hat * self.vtheta[z]
    }

    fn metric(&self, _x: &Vector4<f64>) -> Metric {
        Metric::minkowski()
    }

    fn reflect_boundaries(&self, x: &mut Vector4<f64>, k: &mut Vector4<f64>, tol: f64) {
        let rmax = self.r_axis.max();
        let r = fourvec::radius(x);
        if !self.reflect_outer || r <= rmax {
            return;
        }
        let dr = self.r_axis.delta(self.r_axis.len() - 1);
        debug_assert!((r - rmax).abs() < tol * dr);
        reflect_radial(x, k, r, rmax - TINY * dr, &Metric::minkowski());
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn test_grid() -> Grid2DSphere {
        Grid2DSphere::uniform(
            Axis::new(1.0e5, 1.0e6, 6),
            Axis::new(0.0, std::f64::consts::PI, 4),
            Density::from_grams_per_cm3(1e11),
            Temperature::from_mev(5.0),
            0.25,
        )
    }

    #[test]
    fn zone_index_splits_radius_and_angle() {
        let grid = test_grid();

        // on the polar axis, θ = 0 → first θ bin
        let north = Vector4::new(0.0, 0.0, 5.0e5, 0.0);
        let iz = grid.zone_index(&north).unwrap();
        assert_eq!(iz % 4, 0);

        // equator → θ bin 2 (θ = π/2 sits on the wall between bins 1 and 2)
        let equator = Vector4::new(5.0e5, 0.0, 0.0, 0.0);
        let iz = grid.zone_index(&equator).unwrap();
        assert_eq!(iz % 4, 2);
    }

    #[test]
    fn sampled_positions_stay_in_zone() {
        let grid = test_grid();
        let mut rng = ChaChaRng::seed_from_u64(5);

        for z in 0..grid.n_zones() {
            for _ in 0..10 {
                let x = grid.sample_in_zone(z, &mut rng);
                assert_eq!(grid.zone_index(&x), Some(z));
            }
        }
    }

    #[test]
    fn sector_volumes_sum_to_shell() {
        let grid = test_grid();
        let total: f64 = (0..grid.n_zones()).map(|z| grid.zone_lab_volume(z)).sum();
        let expected =
            4.0 * std::f64::consts::PI / 3.0 * ((1.0e6_f64).powi(3) - (1.0e5_f64).powi(3));
        assert_relative_eq!(total, expected, max_relative = 1e-12);
    }

    #[test]
    fn polar_velocity_is_tangent() {
        let n = 6 * 4;
        let grid = Grid2DSphere::new(
            Axis::new(1.0e5, 1.0e6, 6),
            Axis::new(0.0, std::f64::consts::PI, 4),
            vec![Density::from_grams_per_cm3(1e11); n],
            vec![Temperature::from_mev(5.0); n],
            vec![0.25; n],
            vec![0.0; n],
            vec![1.0e8; n],
        );

        let x = Vector4::new(5.0e5, 0.0, 0.0, 0.0);
        let z = grid.zone_index(&x).unwrap();
        let v = grid.fluid_velocity(&x, z);

        // θ̂ at the equator points along −ẑ
        assert_relative_eq!(v[2], -1.0e8, max_relative = 1e-12);
        // rounding of cos(π/2) leaves a ~1e-3 residual at these magnitudes
        assert_relative_eq!(v.dot(&fourvec::spatial(&x)), 0.0, epsilon = 0.1);
    }
}
