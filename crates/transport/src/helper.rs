//! Per-packet relativistic working set.
//!
//! An `EinsteinHelper` pairs a packet with everything derived from its
//! position and wavevector: zone index, metric, fluid 4-velocity, comoving
//! tetrad, tetrad-frame wavevector, and the opacities at its comoving
//! frequency. The packet is copied in at the start of propagation and copied
//! back out at the end, so the pool never hands out references.
//!
//! Contract: after [`EinsteinHelper::update`] every cached field is
//! consistent with the packet's current (x, k). Any mutation of x or k must
//! be followed by another `update` (or [`EinsteinHelper::refresh_opacity`]
//! when only the frequency changed) before cached fields are read.

use nalgebra::Vector4;
use spacetime::{Grid, Metric, Tetrad};
use units::constants::C_LIGHT;

use crate::opacity::OpacityTable;
use crate::packet::Packet;

pub struct EinsteinHelper {
    pub p: Packet,
    /// Zone containing the packet; `None` = out of the domain
    pub z_ind: Option<usize>,
    /// Frequency bin of the comoving frequency; `None` = off the grid
    pub nu_bin: Option<usize>,
    pub g: Metric,
    /// Fluid 4-velocity at the packet position
    pub u: Vector4<f64>,
    pub tetrad: Tetrad,
    /// Wavevector in the comoving tetrad frame
    pub kup_tet: Vector4<f64>,
    /// Absorption opacity at the comoving frequency (1/cm)
    pub absopac: f64,
    /// Scattering opacity at the comoving frequency (1/cm)
    pub scatopac: f64,
    /// Comoving distance of the next sub-step (cm)
    pub ds_com: f64,
}

impl EinsteinHelper {
    pub fn new<G: Grid>(p: Packet, grid: &G, opac: &OpacityTable) -> Self {
        let g = Metric::minkowski();
        let u = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let tetrad = Tetrad::comoving(&g, &u);
        let kup_tet = p.k;
        let mut eh = Self {
            p,
            z_ind: None,
            nu_bin: None,
            g,
            u,
            tetrad,
            kup_tet,
            absopac: 0.0,
            scatopac: 0.0,
            ds_com: 0.0,
        };
        eh.update(grid, opac);
        eh
    }

    /// Recompute every cached field from the packet's current (x, k).
    ///
    /// Leaves the relativistic fields untouched when the packet is out of
    /// the domain; boundary handling decides what happens next and nothing
    /// reads the cache until the packet is back inside.
    pub fn update<G: Grid>(&mut self, grid: &G, opac: &OpacityTable) {
        self.z_ind = grid.zone_index(&self.p.x);
        let Some(z) = self.z_ind else {
            return;
        };

        self.g = grid.metric(&self.p.x);
        self.u = grid.fluid_4velocity(&self.p.x, z);
        self.tetrad = Tetrad::comoving(&self.g, &self.u);
        self.kup_tet = self.tetrad.coord_to_tetrad(&self.g, &self.p.k);
        debug_assert!(self.g.null_residual(&self.p.k) < 1e-6);
        self.refresh_opacity(opac);
    }

    /// Re-fetch the opacities and frequency bin after a frequency change
    /// that left position, metric, and tetrad intact.
    pub fn refresh_opacity(&mut self, opac: &OpacityTable) {
        let Some(z) = self.z_ind else {
            return;
        };
        let nu = self.nu();
        self.nu_bin = opac.nu_axis().bin(nu);
        self.absopac = opac.absorption(self.p.species, z, nu);
        self.scatopac = opac.scattering(self.p.species, z, nu);
    }

    /// Comoving frequency ν = −g(u, k)·c/2π, read off the tetrad time
    /// component.
    pub fn nu(&self) -> f64 {
        let nu = self.kup_tet[3] * C_LIGHT / (2.0 * std::f64::consts::PI);
        debug_assert!(nu > 0.0);
        nu
    }

    pub fn coord_to_tetrad(&self, v: &Vector4<f64>) -> Vector4<f64> {
        self.tetrad.coord_to_tetrad(&self.g, v)
    }

    pub fn tetrad_to_coord(&self, v_tet: &Vector4<f64>) -> Vector4<f64> {
        self.tetrad.tetrad_to_coord(v_tet)
    }

    /// Install a new tetrad-frame wavevector, keeping both representations
    /// consistent.
    pub fn set_kup_tet(&mut self, kup_tet: Vector4<f64>) {
        self.kup_tet = kup_tet;
        self.p.k = self.tetrad.tetrad_to_coord(&kup_tet);
    }

    /// Rescale the wavevector by `r`. A pure rescaling preserves the null
    /// condition exactly, so no re-normalization is needed.
    pub fn scale_frequency(&mut self, r: f64) {
        debug_assert!(r > 0.0);
        self.p.k *= r;
        self.kup_tet *= r;
    }
}
