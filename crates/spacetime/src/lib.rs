//! Geometry layer for relativistic radiation transport.
//!
//! Provides the binned [`Axis`] type, the 3+1 [`Metric`] with its tetrad
//! machinery, and the [`Grid`] capability trait with spherical, Schwarzschild,
//! and Cartesian implementations. Everything here is agnostic of what is being
//! transported; the transport crate layers packets and opacities on top.
//!
//! # Conventions
//!
//! Four-vectors store their spatial components in slots 0–2 and the time
//! component in slot 3. A wavevector carries `k[3] = 2πν/c` (cm⁻¹) and a
//! 4-position carries `x[3] = ct` (cm), so the time slot doubles as the
//! packet's step budget. The metric signature is (+, +, +, −).

pub mod axis;
pub mod fourvec;
pub mod grid;
pub mod metric;
pub mod tetrad;

#[cfg(test)]
mod metric_test;

pub use axis::Axis;
pub use grid::{Grid, Grid1DSchwarzschild, Grid1DSphere, Grid2DSphere, Grid3DCartesian};
pub use metric::{Christoffel, Metric};
pub use tetrad::{isotropic_direction, isotropic_kup_tet, outward_hemisphere, Tetrad};
