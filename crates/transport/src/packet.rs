//! The Monte Carlo packet.

use nalgebra::{Vector3, Vector4};
use units::constants::{C_LIGHT, H_PLANCK};

/// What has happened to a packet. `Moving` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Moving,
    Escaped,
    Absorbed,
    Rouletted,
}

/// A sample packet standing in for `n` physical neutrinos.
///
/// The 4-position carries ct in its time slot, so it doubles as the step
/// budget; the wavevector is null with `k[3] = 2πν_lab/c`. Packets are plain
/// `Copy` data owned by the per-rank pool; splits append copies, nothing
/// holds pointers into the pool.
#[derive(Debug, Clone, Copy)]
pub struct Packet {
    /// 4-position (cm; time slot is ct)
    pub x: Vector4<f64>,
    /// Null 4-wavevector (cm⁻¹)
    pub k: Vector4<f64>,
    /// Number of physical neutrinos represented
    pub n: f64,
    /// Remaining optical-depth budget
    pub tau: f64,
    /// Species index into the species list
    pub species: usize,
    /// RNG stream identifier
    pub id: u64,
    pub fate: Fate,
}

impl Packet {
    /// Lab-frame frequency read off the wavevector, assuming an essentially
    /// flat metric at the packet's position. Exact wherever packets escape.
    pub fn lab_frequency(&self) -> f64 {
        self.k[3] / (2.0 * std::f64::consts::PI) * C_LIGHT
    }

    /// Lab-frame energy carried by the whole packet (erg).
    pub fn lab_energy(&self) -> f64 {
        self.n * self.lab_frequency() * H_PLANCK
    }

    /// Unit propagation direction (flat-space normalization).
    pub fn direction(&self) -> Vector3<f64> {
        let d = Vector3::new(self.k[0], self.k[1], self.k[2]);
        d / d.norm()
    }
}
