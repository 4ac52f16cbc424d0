//! 1D spherical grid with an analytic Schwarzschild metric.
//!
//! In areal coordinates outside the horizon: α(r) = √(1 − r_s/r),
//! X(r) = 1/α(r), so the metric functions and their radial derivatives are
//! evaluated in closed form rather than from tabulated zone values. Used by
//! the ray tracer and the gravitational-redshift tests; the fluid state is
//! typically vacuum.

use nalgebra::{Matrix3, Vector3, Vector4};
use rand_chacha::ChaChaRng;
use units::{Density, Temperature};

use crate::axis::Axis;
use crate::fourvec;
use crate::grid::sphere1d::{christoffel_radial, reflect_radial, sample_core_surface, sample_shell};
use crate::grid::{Grid, TINY};
use crate::metric::{Christoffel, Metric};

#[derive(Debug, Clone)]
pub struct Grid1DSchwarzschild {
    r_axis: Axis,
    /// Schwarzschild radius (cm); the grid must lie entirely outside it
    r_sch: f64,
    rho: Vec<f64>,
    temp: Vec<f64>,
    ye: Vec<f64>,
    reflect_outer: bool,
}

impl Grid1DSchwarzschild {
    pub fn new(r_axis: Axis, r_sch: f64) -> Self {
        assert!(r_sch > 0.0);
        assert!(
            r_axis.min > r_sch,
            "grid must lie outside the Schwarzschild radius"
        );
        let n = r_axis.len();
        Self {
            r_axis,
            r_sch,
            rho: vec![0.0; n],
            temp: vec![0.0; n],
            ye: vec![0.0; n],
            reflect_outer: false,
        }
    }

    /// Attach a uniform fluid state (the geometry tests mostly run in
    /// vacuum, the transport tests do not).
    pub fn with_fluid(mut self, rho: Density, temp: Temperature, ye: f64) -> Self {
        self.rho.fill(rho.to_grams_per_cm3());
        self.temp.fill(temp.to_kelvin());
        self.ye.fill(ye);
        self
    }

    pub fn with_reflecting_outer(mut self) -> Self {
        self.reflect_outer = true;
        self
    }

    pub fn r_schwarzschild(&self) -> f64 {
        self.r_sch
    }

    /// Lapse α(r) = √(1 − r_s/r).
    pub fn lapse(&self, r: f64) -> f64 {
        debug_assert!(r > self.r_sch);
        (1.0 - self.r_sch / r).sqrt()
    }

    /// Radial stretch X(r) = 1/α(r).
    pub fn x_metric(&self, r: f64) -> f64 {
        1.0 / self.lapse(r)
    }

    /// dα/dr = r_s / (2r²α).
    fn dadr(&self, r: f64) -> f64 {
        self.r_sch / (2.0 * r * r * self.lapse(r))
    }

    /// dX/dr = −X² dα/dr.
    fn dxdr(&self, r: f64) -> f64 {
        let x = self.x_metric(r);
        -x * x * self.dadr(r)
    }
}

impl Grid for Grid1DSchwarzschild {
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
        4.0 * std::f64::consts::PI / 3.0
            * (r1.powi(3) - r0.powi(3))
            * self.x_metric(self.r_axis.mid[z])
    }

    fn zone_lorentz_factor(&self, _z: usize) -> f64 {
        1.0
    }

    fn zone_radius(&self, z: usize) -> f64 {
        self.r_axis.top[z]
    }

    fn sample_in_zone(&self, z: usize, rng: &mut ChaChaRng) -> Vector4<f64> {
        // the X weighting is uniform within a thin zone, so the flat shell
        // sampler is adequate
        sample_shell(&self.r_axis, z, rng)
    }

    fn fluid_velocity(&self, _x: &Vector4<f64>, _z: usize) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn metric(&self, x: &Vector4<f64>) -> Metric {
        let r = fourvec::radius(x);
        let alpha = self.lapse(r);
        let xm = self.x_metric(r);

        let mut gamma = Matrix3::identity();
        let coeff = (xm * xm - 1.0) / (r * r);
        for i in 0..3 {
            for j in 0..3 {
                gamma[(i, j)] += x[i] * x[j] * coeff;
            }
        }
        Metric::new(alpha, Vector3::zeros(), gamma)
    }

    fn christoffel(&self, x: &Vector4<f64>) -> Christoffel {
        let r = fourvec::radius(x);
        christoffel_radial(
            x,
            r,
            self.lapse(r),
            self.x_metric(r),
            self.dadr(r),
            self.dxdr(r),
        )
    }

    fn do_gr(&self) -> bool {
        true
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

    fn test_grid() -> Grid1DSchwarzschild {
        // r_s = 1e5 cm, grid from 2 r_s to 200 r_s
        Grid1DSchwarzschild::new(Axis::new(2.0e5, 2.0e7, 100), 1.0e5)
    }

    #[test]
    fn lapse_matches_schwarzschild_form() {
        let grid = test_grid();
        assert_relative_eq!(grid.lapse(2.0e5), (0.5_f64).sqrt());
        assert_relative_eq!(grid.x_metric(2.0e5), 1.0 / (0.5_f64).sqrt());
        // asymptotically flat
        assert!((grid.lapse(1.0e10) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn metric_reduces_to_flat_far_away() {
        let grid = test_grid();
        let x = Vector4::new(1.0e12, 0.0, 0.0, 0.0);
        let g = grid.metric(&x);

        let radial = Vector4::new(1.0, 0.0, 0.0, 0.0);
        assert_relative_eq!(g.dot4(&radial, &radial), 1.0, max_relative = 1e-6);
        assert_relative_eq!(g.alpha, 1.0, max_relative = 1e-6);
    }

    #[test]
    fn radial_photon_gains_coordinate_speed_outward() {
        // dk^t/dλ < 0 for an outgoing photon: the time component redshifts
        let grid = test_grid();
        let x = Vector4::new(4.0e5, 0.0, 0.0, 0.0);
        let conn = grid.christoffel(&x);

        let g = grid.metric(&x);
        let mut k = Vector4::new(1.0, 0.0, 0.0, 0.0);
        g.normalize_null(&mut k);

        let mut dk_dt = 0.0;
        for mu in 0..4 {
            for nu in 0..4 {
                dk_dt -= conn[3][mu][nu] * k[mu] * k[nu];
            }
        }
        assert!(dk_dt < 0.0, "outgoing photon time component must decrease");
    }

    #[test]
    fn radial_frequency_shift_matches_the_lapse_ratio() {
        // a photon climbing from 10 r_s to 100 r_s redshifts by
        // α(r₁)/α(r₂) = √(1 − r_s/r₁)/√(1 − r_s/r₂) for static observers
        let r_s = 1.0e5;
        let grid = Grid1DSchwarzschild::new(Axis::new(2.0e5, 2.0e7, 1000), r_s);

        let r1 = 10.0 * r_s;
        let r2 = 100.0 * r_s;
        let mut x = Vector4::new(r1, 0.0, 0.0, 0.0);
        let g = grid.metric(&x);
        let mut k = Vector4::new(1.0e-10, 0.0, 0.0, 0.0);
        g.normalize_null(&mut k);

        // local frequency seen by a static observer ∝ α k⁰
        let nu1 = grid.lapse(r1) * k[3];

        let ds = 50.0;
        while x[0] < r2 {
            let dlambda = ds / k[3];
            grid.geodesic_step(&mut x, &mut k, dlambda);
        }
        let r_end = fourvec::radius(&x);
        let nu2 = grid.lapse(r_end) * k[3];

        let measured = nu2 / nu1;
        let expected = (1.0 - r_s / r1).sqrt() / (1.0 - r_s / r_end).sqrt();
        assert!(
            (measured / expected - 1.0).abs() < 1.0e-4,
            "shift {} vs {}",
            measured,
            expected
        );
    }

    #[test]
    fn geodesic_step_preserves_null_condition() {
        let grid = test_grid();
        let mut x = Vector4::new(1.0e6, 0.0, 0.0, 0.0);
        let g = grid.metric(&x);
        let mut k = Vector4::new(1.0, 0.5, 0.0, 0.0);
        g.normalize_null(&mut k);

        for _ in 0..100 {
            let dlambda = 1.0e3 / k[3];
            grid.geodesic_step(&mut x, &mut k, dlambda);
            let g = grid.metric(&x);
            assert!(g.null_residual(&k) < 1e-10);
        }
    }
}
