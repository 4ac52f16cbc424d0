//! Per-step radiation accumulators.
//!
//! Everything a step accumulates lives in a [`Tally`]: the per-species
//! distribution moment arrays, the four-force deposited into and released by
//! the matter, lepton-number exchange, the escape spectra, and the global
//! audit counters. Tallies are plain additive state: worker threads fill
//! private scratch tallies which are merged associatively, then reduced
//! across ranks, then normalized into physical units.

use nalgebra::{Vector3, Vector4};
use spacetime::{Axis, Grid};

use crate::comm::Communicator;
use crate::output::DatasetSink;

/// Flattened (zone × frequency × moment) storage behind both distribution
/// variants.
#[derive(Debug, Clone)]
pub struct MomentData {
    n_zones: usize,
    n_nu: usize,
    n_mom: usize,
    data: Vec<f64>,
}

impl MomentData {
    fn new(n_zones: usize, n_nu: usize, n_mom: usize) -> Self {
        Self {
            n_zones,
            n_nu,
            n_mom,
            data: vec![0.0; n_zones * n_nu * n_mom],
        }
    }

    #[inline]
    fn base(&self, z: usize, g: usize) -> usize {
        (z * self.n_nu + g) * self.n_mom
    }

    pub fn get(&self, z: usize, g: usize, m: usize) -> f64 {
        self.data[self.base(z, g) + m]
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.n_zones, self.n_nu, self.n_mom]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// Directional moment array of one species.
///
/// `Radial` is the 1D six-moment instance (E, F_r, P_rr, ½(P_θθ+P_φφ),
/// W_rrr, ½(W_rθθ+W_rφφ)) built from the radial direction cosine; `Full`
/// stores E, the three flux components, and the six independent pressure
/// components.
#[derive(Debug, Clone)]
pub enum Distribution {
    Radial(MomentData),
    Full(MomentData),
}

impl Distribution {
    pub const RADIAL_MOMENTS: usize = 6;
    pub const FULL_MOMENTS: usize = 10;

    pub fn radial(n_zones: usize, n_nu: usize) -> Self {
        Self::Radial(MomentData::new(n_zones, n_nu, Self::RADIAL_MOMENTS))
    }

    pub fn full(n_zones: usize, n_nu: usize) -> Self {
        Self::Full(MomentData::new(n_zones, n_nu, Self::FULL_MOMENTS))
    }

    pub fn moments(&self) -> &MomentData {
        match self {
            Self::Radial(m) | Self::Full(m) => m,
        }
    }

    fn moments_mut(&mut self) -> &mut MomentData {
        match self {
            Self::Radial(m) | Self::Full(m) => m,
        }
    }

    /// Deposit energy `e` along the tetrad-frame direction of `kup_tet` at
    /// position `x` into cell (z, g).
    pub fn count(&mut self, kup_tet: &Vector4<f64>, x: &Vector4<f64>, z: usize, g: usize, e: f64) {
        debug_assert!(e >= 0.0);
        debug_assert!(e.is_finite());

        let mut d = Vector3::new(kup_tet[0], kup_tet[1], kup_tet[2]);
        d /= d.norm();

        match self {
            Self::Radial(m) => {
                let r = (x[0] * x[0] + x[1] * x[1] + x[2] * x[2]).sqrt();
                let mu = if r > 0.0 {
                    (d[0] * x[0] + d[1] * x[1] + d[2] * x[2]) / r
                } else {
                    0.0
                };
                let perp = 0.5 * (1.0 - mu * mu);
                let base = m.base(z, g);
                let row = &mut m.data[base..base + Self::RADIAL_MOMENTS];
                row[0] += e;
                row[1] += e * mu;
                row[2] += e * mu * mu;
                row[3] += e * perp;
                row[4] += e * mu * mu * mu;
                row[5] += e * mu * perp;
            }
            Self::Full(m) => {
                let base = m.base(z, g);
                let row = &mut m.data[base..base + Self::FULL_MOMENTS];
                row[0] += e;
                row[1] += e * d[0];
                row[2] += e * d[1];
                row[3] += e * d[2];
                row[4] += e * d[0] * d[0];
                row[5] += e * d[0] * d[1];
                row[6] += e * d[0] * d[2];
                row[7] += e * d[1] * d[1];
                row[8] += e * d[1] * d[2];
                row[9] += e * d[2] * d[2];
            }
        }
    }

    /// Deposit energy with no net direction: the isotropic moments only.
    pub fn add_isotropic(&mut self, z: usize, g: usize, e: f64) {
        debug_assert!(e >= 0.0);
        match self {
            Self::Radial(m) => {
                let base = m.base(z, g);
                m.data[base] += e;
                m.data[base + 2] += e / 3.0;
                m.data[base + 3] += e / 3.0;
            }
            Self::Full(m) => {
                let base = m.base(z, g);
                m.data[base] += e;
                m.data[base + 4] += e / 3.0;
                m.data[base + 7] += e / 3.0;
                m.data[base + 9] += e / 3.0;
            }
        }
    }

    /// Sum of the energy moment over all cells.
    pub fn total(&self) -> f64 {
        let m = self.moments();
        m.data.chunks_exact(m.n_mom).map(|row| row[0]).sum()
    }

    /// Energy moment summed over zones, per frequency bin.
    pub fn energy_by_bin(&self) -> Vec<f64> {
        let m = self.moments();
        let mut out = vec![0.0; m.n_nu];
        for z in 0..m.n_zones {
            for g in 0..m.n_nu {
                out[g] += m.data[m.base(z, g)];
            }
        }
        out
    }

    fn merge(&mut self, other: &Self) {
        let (a, b) = (self.moments_mut(), other.moments());
        debug_assert_eq!(a.data.len(), b.data.len());
        for (x, y) in a.data.iter_mut().zip(&b.data) {
            *x += y;
        }
    }

    fn wipe(&mut self) {
        self.moments_mut().data.fill(0.0);
    }

    fn rescale_cell(&mut self, z: usize, g: usize, factor: f64) {
        let m = self.moments_mut();
        let base = m.base(z, g);
        for v in &mut m.data[base..base + m.n_mom] {
            *v *= factor;
        }
    }
}

/// Escape spectrum binned over direction (μ, φ) and frequency, with
/// underflow/overflow folded into the edge bins.
#[derive(Debug, Clone)]
pub struct AngularSpectrum {
    nu_axis: Axis,
    mu_axis: Axis,
    phi_axis: Axis,
    flux: Vec<f64>,
}

impl AngularSpectrum {
    pub fn new(nu_axis: Axis, n_mu: usize, n_phi: usize) -> Self {
        let mu_axis = Axis::new(-1.0, 1.0, n_mu);
        let phi_axis = Axis::new(-std::f64::consts::PI, std::f64::consts::PI, n_phi);
        let flux = vec![0.0; nu_axis.len() * n_mu * n_phi];
        Self {
            nu_axis,
            mu_axis,
            phi_axis,
            flux,
        }
    }

    fn index(&self, g: usize, imu: usize, iphi: usize) -> usize {
        (g * self.mu_axis.len() + imu) * self.phi_axis.len() + iphi
    }

    /// Count an escaping packet of energy `e` with lab direction `d`.
    pub fn count(&mut self, d: &Vector3<f64>, nu: f64, e: f64) {
        debug_assert!(e >= 0.0);
        let g = self.nu_axis.bin_clamped(nu);
        let imu = self.mu_axis.bin_clamped(d[2]);
        let iphi = self.phi_axis.bin_clamped(d[1].atan2(d[0]));
        let i = self.index(g, imu, iphi);
        self.flux[i] += e;
    }

    /// Total escaping energy.
    pub fn integrate(&self) -> f64 {
        self.flux.iter().sum()
    }

    /// Energy per frequency bin, integrated over direction.
    pub fn integrate_over_direction(&self) -> Vec<f64> {
        let n_dir = self.mu_axis.len() * self.phi_axis.len();
        self.flux
            .chunks_exact(n_dir)
            .map(|chunk| chunk.iter().sum())
            .collect()
    }

    pub fn rescale(&mut self, r: f64) {
        for v in &mut self.flux {
            *v *= r;
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.nu_axis.len(), self.mu_axis.len(), self.phi_axis.len()]
    }

    pub fn data(&self) -> &[f64] {
        &self.flux
    }

    fn merge(&mut self, other: &Self) {
        for (x, y) in self.flux.iter_mut().zip(&other.flux) {
            *x += y;
        }
    }

    fn wipe(&mut self) {
        self.flux.fill(0.0);
    }
}

/// Everything one step accumulates.
#[derive(Debug, Clone)]
pub struct Tally {
    /// Per-species distribution moment array
    pub distribution: Vec<Distribution>,
    /// Per-species escape spectrum
    pub spectrum: Vec<AngularSpectrum>,

    /// Tetrad-frame 4-force absorbed by the matter, per zone (erg)
    pub fourforce_abs: Vec<[f64; 4]>,
    /// Tetrad-frame 4-force released by emission, per zone (erg)
    pub fourforce_emit: Vec<[f64; 4]>,
    /// Lepton number absorbed per zone
    pub l_abs: Vec<f64>,
    /// Lepton number emitted per zone
    pub l_emit: Vec<f64>,

    /// Neutrinos emitted from the zones, per species
    pub n_emit_lab: Vec<f64>,
    /// Neutrinos emitted from the core, per species
    pub n_core_lab: Vec<f64>,
    /// Neutrinos escaped, per species
    pub n_escape_num: Vec<f64>,
    /// Energy escaped, per species (erg)
    pub l_escape: Vec<f64>,

    /// Packets propagated, per species
    pub n_active: Vec<u64>,
    /// Packets escaped, per species
    pub n_escape: Vec<u64>,

    /// Energy conservation audit over the surviving pool (erg)
    pub total_energy: f64,
    pub core_abs_energy: f64,
    pub rouletted_energy: f64,
    pub escape_energy: f64,
}

impl Tally {
    pub fn new(
        n_species: usize,
        n_zones: usize,
        nu_axis: &Axis,
        radial_moments: bool,
        spectrum_n_mu: usize,
        spectrum_n_phi: usize,
    ) -> Self {
        let n_nu = nu_axis.len();
        let distribution = (0..n_species)
            .map(|_| {
                if radial_moments {
                    Distribution::radial(n_zones, n_nu)
                } else {
                    Distribution::full(n_zones, n_nu)
                }
            })
            .collect();
        let spectrum = (0..n_species)
            .map(|_| AngularSpectrum::new(nu_axis.clone(), spectrum_n_mu, spectrum_n_phi))
            .collect();

        Self {
            distribution,
            spectrum,
            fourforce_abs: vec![[0.0; 4]; n_zones],
            fourforce_emit: vec![[0.0; 4]; n_zones],
            l_abs: vec![0.0; n_zones],
            l_emit: vec![0.0; n_zones],
            n_emit_lab: vec![0.0; n_species],
            n_core_lab: vec![0.0; n_species],
            n_escape_num: vec![0.0; n_species],
            l_escape: vec![0.0; n_species],
            n_active: vec![0; n_species],
            n_escape: vec![0; n_species],
            total_energy: 0.0,
            core_abs_energy: 0.0,
            rouletted_energy: 0.0,
            escape_energy: 0.0,
        }
    }

    /// A zeroed tally with the same shape, for per-thread scratch.
    pub fn fresh(&self) -> Self {
        let mut t = self.clone();
        t.wipe();
        t
    }

    /// Reset every accumulator to zero.
    pub fn wipe(&mut self) {
        for d in &mut self.distribution {
            d.wipe();
        }
        for s in &mut self.spectrum {
            s.wipe();
        }
        self.fourforce_abs.fill([0.0; 4]);
        self.fourforce_emit.fill([0.0; 4]);
        self.l_abs.fill(0.0);
        self.l_emit.fill(0.0);
        self.n_emit_lab.fill(0.0);
        self.n_core_lab.fill(0.0);
        self.n_escape_num.fill(0.0);
        self.l_escape.fill(0.0);
        self.n_active.fill(0);
        self.n_escape.fill(0);
        self.total_energy = 0.0;
        self.core_abs_energy = 0.0;
        self.rouletted_energy = 0.0;
        self.escape_energy = 0.0;
    }

    /// Fold another tally into this one. Addition is commutative and
    /// associative up to floating point, which is the accepted tolerance.
    pub fn merge(&mut self, other: &Tally) {
        for (a, b) in self.distribution.iter_mut().zip(&other.distribution) {
            a.merge(b);
        }
        for (a, b) in self.spectrum.iter_mut().zip(&other.spectrum) {
            a.merge(b);
        }
        for (a, b) in self.fourforce_abs.iter_mut().zip(&other.fourforce_abs) {
            for i in 0..4 {
                a[i] += b[i];
            }
        }
        for (a, b) in self.fourforce_emit.iter_mut().zip(&other.fourforce_emit) {
            for i in 0..4 {
                a[i] += b[i];
            }
        }
        merge_f64(&mut self.l_abs, &other.l_abs);
        merge_f64(&mut self.l_emit, &other.l_emit);
        merge_f64(&mut self.n_emit_lab, &other.n_emit_lab);
        merge_f64(&mut self.n_core_lab, &other.n_core_lab);
        merge_f64(&mut self.n_escape_num, &other.n_escape_num);
        merge_f64(&mut self.l_escape, &other.l_escape);
        for (a, b) in self.n_active.iter_mut().zip(&other.n_active) {
            *a += b;
        }
        for (a, b) in self.n_escape.iter_mut().zip(&other.n_escape) {
            *a += b;
        }
        self.total_energy += other.total_energy;
        self.core_abs_energy += other.core_abs_energy;
        self.rouletted_energy += other.rouletted_energy;
        self.escape_energy += other.escape_energy;
    }

    /// All-rank element-wise combine. The escape spectra are averaged across
    /// ranks; everything else is summed.
    pub fn reduce(&mut self, comm: &dyn Communicator) {
        for d in &mut self.distribution {
            comm.allsum_f64(&mut d.moments_mut().data);
        }
        let n_ranks = comm.n_ranks() as f64;
        for s in &mut self.spectrum {
            comm.allsum_f64(&mut s.flux);
            s.rescale(1.0 / n_ranks);
        }
        let mut forces: Vec<f64> = self
            .fourforce_abs
            .iter()
            .chain(self.fourforce_emit.iter())
            .flatten()
            .copied()
            .collect();
        comm.allsum_f64(&mut forces);
        let n_zones = self.fourforce_abs.len();
        for z in 0..n_zones {
            for i in 0..4 {
                self.fourforce_abs[z][i] = forces[z * 4 + i];
                self.fourforce_emit[z][i] = forces[(n_zones + z) * 4 + i];
            }
        }

        comm.allsum_f64(&mut self.l_abs);
        comm.allsum_f64(&mut self.l_emit);
        comm.allsum_f64(&mut self.n_emit_lab);
        comm.allsum_f64(&mut self.n_core_lab);
        comm.allsum_f64(&mut self.n_escape_num);
        comm.allsum_f64(&mut self.l_escape);
        comm.allsum_u64(&mut self.n_active);
        comm.allsum_u64(&mut self.n_escape);

        let mut audit = [
            self.total_energy,
            self.core_abs_energy,
            self.rouletted_energy,
            self.escape_energy,
        ];
        comm.allsum_f64(&mut audit);
        [
            self.total_energy,
            self.core_abs_energy,
            self.rouletted_energy,
            self.escape_energy,
        ] = audit;
    }

    /// Convert accumulated tallies into physical intensities: each
    /// distribution cell is divided by (comoving volume × Δν × dt), the
    /// per-zone deposition arrays by (comoving volume × dt), and the escape
    /// quantities by dt.
    pub fn normalize<G: Grid>(&mut self, grid: &G, nu_axis: &Axis, dt_seconds: f64) {
        debug_assert!(dt_seconds > 0.0);
        for z in 0..grid.n_zones() {
            let vol = grid.zone_com_volume(z);
            for d in &mut self.distribution {
                for g in 0..nu_axis.len() {
                    d.rescale_cell(z, g, 1.0 / (vol * nu_axis.delta(g) * dt_seconds));
                }
            }
            for i in 0..4 {
                self.fourforce_abs[z][i] /= vol * dt_seconds;
                self.fourforce_emit[z][i] /= vol * dt_seconds;
            }
            self.l_abs[z] /= vol * dt_seconds;
            self.l_emit[z] /= vol * dt_seconds;
        }
        for s in &mut self.spectrum {
            s.rescale(1.0 / dt_seconds);
        }
    }

    /// Emit every finalized array to the delegated writer.
    pub fn write_datasets(&self, sink: &mut dyn DatasetSink) {
        for (s, d) in self.distribution.iter().enumerate() {
            let m = d.moments();
            sink.write_dataset(&format!("distribution{}", s), &m.dims(), m.data());
        }
        for (s, sp) in self.spectrum.iter().enumerate() {
            sink.write_dataset(&format!("spectrum{}", s), &sp.dims(), sp.data());
        }

        let n_zones = self.fourforce_abs.len();
        let abs_flat: Vec<f64> = self.fourforce_abs.iter().flatten().copied().collect();
        let emit_flat: Vec<f64> = self.fourforce_emit.iter().flatten().copied().collect();
        sink.write_dataset("fourforce_abs", &[n_zones, 4], &abs_flat);
        sink.write_dataset("fourforce_emit", &[n_zones, 4], &emit_flat);
        sink.write_dataset("l_abs", &[n_zones], &self.l_abs);
        sink.write_dataset("l_emit", &[n_zones], &self.l_emit);

        let n_species = self.l_escape.len();
        sink.write_dataset("L_net_esc", &[n_species], &self.l_escape);
        sink.write_dataset("N_net_esc", &[n_species], &self.n_escape_num);
    }
}

fn merge_f64(a: &mut [f64], b: &[f64]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn nu_axis() -> Axis {
        Axis::new(0.0, 10.0, 5)
    }

    #[test]
    fn radial_moments_of_a_radial_packet() {
        let mut dist = Distribution::radial(2, 5);
        // packet at +x moving radially outward
        let x = Vector4::new(1.0, 0.0, 0.0, 0.0);
        let k = Vector4::new(2.0, 0.0, 0.0, 2.0);
        dist.count(&k, &x, 1, 3, 10.0);

        let m = dist.moments();
        assert_relative_eq!(m.get(1, 3, 0), 10.0); // E
        assert_relative_eq!(m.get(1, 3, 1), 10.0); // F_r, μ = 1
        assert_relative_eq!(m.get(1, 3, 2), 10.0); // P_rr
        assert_relative_eq!(m.get(1, 3, 3), 0.0); // transverse pressure
        assert_relative_eq!(m.get(1, 3, 4), 10.0); // W_rrr
        assert_relative_eq!(dist.total(), 10.0);
    }

    #[test]
    fn tangential_packet_fills_transverse_moments() {
        let mut dist = Distribution::radial(1, 5);
        let x = Vector4::new(1.0, 0.0, 0.0, 0.0);
        let k = Vector4::new(0.0, 3.0, 0.0, 3.0);
        dist.count(&k, &x, 0, 0, 8.0);

        let m = dist.moments();
        assert_relative_eq!(m.get(0, 0, 1), 0.0); // no radial flux
        assert_relative_eq!(m.get(0, 0, 3), 4.0); // ½(P_θθ+P_φφ) = E/2
    }

    #[test]
    fn isotropic_deposit_matches_radiation_pressure() {
        let mut dist = Distribution::radial(1, 5);
        dist.add_isotropic(0, 2, 9.0);

        let m = dist.moments();
        assert_relative_eq!(m.get(0, 2, 0), 9.0);
        assert_relative_eq!(m.get(0, 2, 2), 3.0); // P_rr = E/3
        assert_relative_eq!(m.get(0, 2, 3), 3.0);
        assert_relative_eq!(m.get(0, 2, 1), 0.0);
    }

    #[test]
    fn full_moments_store_pressure_tensor() {
        let mut dist = Distribution::full(1, 5);
        let x = Vector4::zeros();
        let k = Vector4::new(0.6, 0.8, 0.0, 1.0);
        dist.count(&k, &x, 0, 0, 5.0);

        let m = dist.moments();
        assert_relative_eq!(m.get(0, 0, 1), 3.0); // F_x = E·0.6
        assert_relative_eq!(m.get(0, 0, 2), 4.0); // F_y
        assert_relative_eq!(m.get(0, 0, 4), 5.0 * 0.36); // P_xx
        assert_relative_eq!(m.get(0, 0, 5), 5.0 * 0.48); // P_xy
    }

    #[test]
    fn spectrum_folds_overflow_into_edge_bins() {
        let mut spec = AngularSpectrum::new(nu_axis(), 4, 2);
        let d = Vector3::new(0.0, 0.0, 1.0);

        spec.count(&d, 5.0, 1.0);
        spec.count(&d, 99.0, 2.0); // above the grid → last bin
        spec.count(&d, -1.0, 4.0); // below → first bin

        assert_relative_eq!(spec.integrate(), 7.0);
        let by_nu = spec.integrate_over_direction();
        assert_relative_eq!(by_nu[0], 4.0);
        assert_relative_eq!(by_nu[2], 1.0);
        assert_relative_eq!(by_nu[4], 2.0);
    }

    #[test]
    fn merge_adds_everything() {
        let axis = nu_axis();
        let mut a = Tally::new(1, 2, &axis, true, 4, 1);
        let mut b = a.fresh();

        a.l_abs[0] = 1.0;
        b.l_abs[0] = 2.0;
        a.total_energy = 5.0;
        b.total_energy = 7.0;
        b.n_active[0] = 3;
        a.distribution[0].add_isotropic(0, 0, 1.0);
        b.distribution[0].add_isotropic(0, 0, 2.0);

        a.merge(&b);
        assert_relative_eq!(a.l_abs[0], 3.0);
        assert_relative_eq!(a.total_energy, 12.0);
        assert_eq!(a.n_active[0], 3);
        assert_relative_eq!(a.distribution[0].total(), 3.0);
    }

    #[test]
    fn wipe_zeroes_everything() {
        let axis = nu_axis();
        let mut t = Tally::new(2, 3, &axis, false, 4, 2);
        t.l_emit[1] = 4.0;
        t.escape_energy = 2.0;
        t.spectrum[0].count(&Vector3::new(0.0, 0.0, 1.0), 5.0, 1.0);

        t.wipe();
        assert_eq!(t.l_emit[1], 0.0);
        assert_eq!(t.escape_energy, 0.0);
        assert_eq!(t.spectrum[0].integrate(), 0.0);
    }
}
