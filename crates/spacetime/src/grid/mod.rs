//! Grid capability interface and its implementations.
//!
//! A grid owns the zone decomposition of space, the fluid state attached to
//! each zone (ρ, T, Yₑ, v), and the metric. The transport engine only ever
//! talks to the [`Grid`] trait; dispatch is static through a generic driver,
//! so nothing virtual sits on the packet loop.

mod cartesian3d;
mod schwarzschild;
mod sphere1d;
mod sphere2d;

pub use cartesian3d::Grid3DCartesian;
pub use schwarzschild::Grid1DSchwarzschild;
pub use sphere1d::Grid1DSphere;
pub use sphere2d::Grid2DSphere;

use nalgebra::{Vector3, Vector4};
use rand_chacha::ChaChaRng;
use units::constants::C_LIGHT;

use crate::axis::Axis;
use crate::fourvec;
use crate::metric::{Christoffel, Metric};

/// Relative margin used when depositing reflected packets just inside a
/// boundary wall.
pub const TINY: f64 = 1e-10;

/// Capability interface of a zone-decomposed fluid background.
///
/// All positions are 4-positions with the time slot carrying ct; all lengths
/// are lab-frame cm unless stated otherwise.
pub trait Grid: Send + Sync {
    /// Number of zones.
    fn n_zones(&self) -> usize;

    /// The spatial axes of the zone decomposition, outermost first.
    fn spatial_axes(&self) -> Vec<Axis>;

    /// Zone containing `x`, or `None` when `x` is outside the domain.
    fn zone_index(&self, x: &Vector4<f64>) -> Option<usize>;

    /// Per-axis bin indices of a zone, outermost axis first.
    fn zone_directional_indices(&self, z: usize) -> Vec<usize>;

    /// Smallest extent of a zone, used as the step-size floor.
    fn zone_min_length(&self, z: usize) -> f64;

    /// Distance from `x` to the nearest wall of zone `z`.
    fn zone_cell_dist(&self, x: &Vector4<f64>, z: usize) -> f64;

    /// Lab-frame 3-volume of a zone (includes the metric factor on GR grids).
    fn zone_lab_volume(&self, z: usize) -> f64;

    /// Lorentz factor of the zone's fluid.
    fn zone_lorentz_factor(&self, z: usize) -> f64;

    /// Outer radius of the zone, used for the r ≥ r_core emission cut.
    fn zone_radius(&self, z: usize) -> f64;

    /// Sample a position uniformly by volume within zone `z` (time slot 0).
    fn sample_in_zone(&self, z: usize, rng: &mut ChaChaRng) -> Vector4<f64>;

    /// Coordinate fluid 3-velocity at `x` (cm/s).
    fn fluid_velocity(&self, x: &Vector4<f64>, z: usize) -> Vector3<f64>;

    /// Metric at `x`.
    fn metric(&self, x: &Vector4<f64>) -> Metric;

    /// Connection coefficients at `x`; identically zero on flat grids.
    fn christoffel(&self, _x: &Vector4<f64>) -> Christoffel {
        [[[0.0; 4]; 4]; 4]
    }

    /// Whether geodesics curve on this grid.
    fn do_gr(&self) -> bool {
        false
    }

    /// Apply reflecting boundaries, possibly modifying `x` and `k`. The
    /// direction is taken from the packet's current wavevector. `tol` bounds
    /// how far past a wall a packet may legitimately land (a fraction of the
    /// local zone width).
    fn reflect_boundaries(&self, x: &mut Vector4<f64>, k: &mut Vector4<f64>, tol: f64);

    /// Sample an emission point on the core surface of radius `r_core` and a
    /// direction uniform in the outward hemisphere.
    fn random_core_x_d(&self, r_core: f64, rng: &mut ChaChaRng) -> (Vector4<f64>, Vector3<f64>);

    /// Mass density of the zone fluid (g/cm³).
    fn rho(&self, z: usize) -> f64;

    /// Temperature of the zone fluid (K).
    fn temp(&self, z: usize) -> f64;

    /// Electron fraction of the zone fluid.
    fn ye(&self, z: usize) -> f64;

    /// Comoving 3-volume of a zone.
    fn zone_com_volume(&self, z: usize) -> f64 {
        self.zone_lab_volume(z) * self.zone_lorentz_factor(z)
    }

    /// Fluid 4-velocity at `x`: uⁱ = γvⁱ/c, u⁰ = γ/α, normalized to
    /// g(u, u) = −1.
    fn fluid_4velocity(&self, x: &Vector4<f64>, z: usize) -> Vector4<f64> {
        let g = self.metric(x);
        let v = self.fluid_velocity(x, z) / C_LIGHT;
        let v4 = fourvec::with_time(&v, 0.0);
        let v2 = g.dot3(&v4, &v4);
        debug_assert!(v2 < 1.0);
        let gamma = 1.0 / (1.0 - v2).sqrt();
        fourvec::with_time(&(v * gamma), gamma / g.alpha)
    }

    /// Advance `x` and `k` by affine parameter `dlambda` along the null
    /// geodesic: second-order in position, first-order in the wavevector,
    /// re-normalized to null at the endpoint. On flat grids this is a
    /// straight line.
    fn geodesic_step(&self, x: &mut Vector4<f64>, k: &mut Vector4<f64>, dlambda: f64) {
        debug_assert!(dlambda >= 0.0);
        let order1 = *k * dlambda;

        if self.do_gr() {
            let conn = self.christoffel(x);
            let mut dk_dlambda = Vector4::zeros();
            for a in 0..4 {
                let mut sum = 0.0;
                for mu in 0..4 {
                    for nu in 0..4 {
                        sum += conn[a][mu][nu] * k[mu] * k[nu];
                    }
                }
                dk_dlambda[a] = -sum;
            }

            for i in 0..4 {
                let order2 = 0.5 * dk_dlambda[i] * dlambda * dlambda;
                // drop the second-order term where it is not a correction
                x[i] += order1[i] + if order2.abs() < order1[i].abs() { order2 } else { 0.0 };
            }
            *k += dk_dlambda * dlambda;

            let g = self.metric(x);
            g.normalize_null(k);
        } else {
            *x += order1;
        }
    }
}

/// Linear interpolation of per-zone values at radius `r`, clamped at the
/// first and last bin centers.
pub(crate) fn interpolate_radial(axis: &Axis, values: &[f64], r: f64) -> f64 {
    debug_assert_eq!(axis.len(), values.len());
    if values.len() == 1 || r <= axis.mid[0] {
        return values[0];
    }
    let last = values.len() - 1;
    if r >= axis.mid[last] {
        return values[last];
    }
    let i = axis.mid.partition_point(|&m| m <= r) - 1;
    let frac = (r - axis.mid[i]) / (axis.mid[i + 1] - axis.mid[i]);
    values[i] * (1.0 - frac) + values[i + 1] * frac
}
