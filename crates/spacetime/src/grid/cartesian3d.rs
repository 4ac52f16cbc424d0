//! 3D Cartesian grid.
//!
//! Rectangular boxes on three axes; the zone index is
//! `(ix * ny + iy) * nz + iz`. Flat metric, per-zone 3-velocity.

use nalgebra::{Vector3, Vector4};
use rand::Rng;
use rand_chacha::ChaChaRng;
use units::constants::C_LIGHT;
use units::{Density, Temperature};

use crate::axis::Axis;
use crate::fourvec;
use crate::grid::sphere1d::sample_core_surface;
use crate::grid::{Grid, TINY};
use crate::metric::Metric;

#[derive(Debug, Clone)]
pub struct Grid3DCartesian {
    axes: [Axis; 3],
    rho: Vec<f64>,
    temp: Vec<f64>,
    ye: Vec<f64>,
    vel: Vec<Vector3<f64>>,
    reflect_outer: bool,
}

impl Grid3DCartesian {
    pub fn new(
        axes: [Axis; 3],
        rho: Vec<Density>,
        temp: Vec<Temperature>,
        ye: Vec<f64>,
        vel: Vec<Vector3<f64>>,
    ) -> Self {
        let n = axes[0].len() * axes[1].len() * axes[2].len();
        assert_eq!(rho.len(), n);
        assert_eq!(temp.len(), n);
        assert_eq!(ye.len(), n);
        assert_eq!(vel.len(), n);

        Self {
            axes,
            rho: rho.iter().map(|r| r.to_grams_per_cm3()).collect(),
            temp: temp.iter().map(|t| t.to_kelvin()).collect(),
            ye,
            vel,
            reflect_outer: false,
        }
    }

    /// Static uniform fluid filling the box.
    pub fn uniform(axes: [Axis; 3], rho: Density, temp: Temperature, ye: f64) -> Self {
        let n = axes[0].len() * axes[1].len() * axes[2].len();
        Self::new(
            axes,
            vec![rho; n],
            vec![temp; n],
            vec![ye; n],
            vec![Vector3::zeros(); n],
        )
    }

    pub fn with_reflecting_outer(mut self) -> Self {
        self.reflect_outer = true;
        self
    }

    fn flat_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.axes[1].len() + iy) * self.axes[2].len() + iz
    }
}

impl Grid for Grid3DCartesian {
    fn n_zones(&self) -> usize {
        self.axes[0].len() * self.axes[1].len() * self.axes[2].len()
    }

    fn spatial_axes(&self) -> Vec<Axis> {
        self.axes.to_vec()
    }

    fn zone_index(&self, x: &Vector4<f64>) -> Option<usize> {
        let ix = self.axes[0].bin(x[0])?;
        let iy = self.axes[1].bin(x[1])?;
        let iz = self.axes[2].bin(x[2])?;
        Some(self.flat_index(ix, iy, iz))
    }

    fn zone_directional_indices(&self, z: usize) -> Vec<usize> {
        let (ix, iy, iz) = self.split(z);
        vec![ix, iy, iz]
    }

    fn zone_min_length(&self, z: usize) -> f64 {
        let (ix, iy, iz) = self.split(z);
        self.axes[0]
            .delta(ix)
            .min(self.axes[1].delta(iy))
            .min(self.axes[2].delta(iz))
    }

    fn zone_cell_dist(&self, x: &Vector4<f64>, z: usize) -> f64 {
        let (ix, iy, iz) = self.split(z);
        let inds = [ix, iy, iz];
        let mut dist = f64::INFINITY;
        for d in 0..3 {
            let lo = x[d] - self.axes[d].bottom(inds[d]);
            let hi = self.axes[d].top[inds[d]] - x[d];
            dist = dist.min(lo).min(hi);
        }
        dist.max(0.0)
    }

    fn zone_lab_volume(&self, z: usize) -> f64 {
        let (ix, iy, iz) = self.split(z);
        self.axes[0].delta(ix) * self.axes[1].delta(iy) * self.axes[2].delta(iz)
    }

    fn zone_lorentz_factor(&self, z: usize) -> f64 {
        let v2 = self.vel[z].norm_squared() / (C_LIGHT * C_LIGHT);
        1.0 / (1.0 - v2).sqrt()
    }

    fn zone_radius(&self, z: usize) -> f64 {
        let (ix, iy, iz) = self.split(z);
        Vector3::new(self.axes[0].mid[ix], self.axes[1].mid[iy], self.axes[2].mid[iz]).norm()
    }

    fn sample_in_zone(&self, z: usize, rng: &mut ChaChaRng) -> Vector4<f64> {
        let (ix, iy, iz) = self.split(z);
        let inds = [ix, iy, iz];
        let mut x = Vector4::zeros();
        for d in 0..3 {
            let lo = self.axes[d].bottom(inds[d]);
            let hi = self.axes[d].top[inds[d]];
            x[d] = lo + (hi - lo) * rng.random::<f64>();
        }
        x
    }

    fn fluid_velocity(&self, _x: &Vector4<f64>, z: usize) -> Vector3<f64> {
        self.vel[z]
    }

    fn metric(&self, _x: &Vector4<f64>) -> Metric {
        Metric::minkowski()
    }

    fn reflect_boundaries(&self, x: &mut Vector4<f64>, k: &mut Vector4<f64>, tol: f64) {
        if !self.reflect_outer {
            return;
        }

        let mut reflected = false;
        for d in 0..3 {
            let lo = self.axes[d].min;
            let hi = self.axes[d].max();
            let margin = TINY * (hi - lo);

            if x[d] >= hi {
                debug_assert!(x[d] - hi < tol * (hi - lo));
                x[d] = hi - margin;
                k[d] = -k[d].abs();
                reflected = true;
            } else if x[d] < lo {
                debug_assert!(lo - x[d] < tol * (hi - lo));
                x[d] = lo + margin;
                k[d] = k[d].abs();
                reflected = true;
            }
        }

        if reflected {
            Metric::minkowski().normalize_null(k);
        }
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

impl Grid3DCartesian {
    fn split(&self, z: usize) -> (usize, usize, usize) {
        let nz = self.axes[2].len();
        let ny = self.axes[1].len();
        (z / (ny * nz), (z / nz) % ny, z % nz)
    }
}
