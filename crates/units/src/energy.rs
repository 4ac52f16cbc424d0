use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::constants::{H_PLANCK, MEV_TO_ERG};
use crate::frequency::Frequency;

/// A physical energy quantity using f64 precision.
///
/// Base unit is the erg. Neutrino energies and chemical potentials are quoted
/// in MeV; `from_mev`/`to_mev` cover that convention, and `to_frequency`
/// converts a photon/neutrino energy to its frequency E/h.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Energy(f64); // Base unit: erg

impl Energy {
    /// Creates a zero energy value
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Energy` from a value in erg.
    pub fn from_erg(value: f64) -> Self {
        Self(value)
    }

    /// Creates a new `Energy` from a value in MeV.
    pub fn from_mev(value: f64) -> Self {
        Self(value * MEV_TO_ERG)
    }

    /// Returns the energy in erg.
    pub fn to_erg(&self) -> f64 {
        self.0
    }

    /// Converts the energy to MeV.
    pub fn to_mev(&self) -> f64 {
        self.0 / MEV_TO_ERG
    }

    /// The frequency of a quantum with this energy: ν = E/h.
    pub fn to_frequency(&self) -> Frequency {
        Frequency::from_hz(self.0 / H_PLANCK)
    }
}

impl Add for Energy {
    type Output = Energy;

    fn add(self, rhs: Energy) -> Energy {
        Energy(self.0 + rhs.0)
    }
}

impl Sub for Energy {
    type Output = Energy;

    fn sub(self, rhs: Energy) -> Energy {
        Energy(self.0 - rhs.0)
    }
}

impl Mul<f64> for Energy {
    type Output = Energy;

    fn mul(self, rhs: f64) -> Energy {
        Energy(self.0 * rhs)
    }
}

impl Div<f64> for Energy {
    type Output = Energy;

    fn div(self, rhs: f64) -> Energy {
        Energy(self.0 / rhs)
    }
}

/// Division of Energy by Energy returns a dimensionless ratio
impl Div for Energy {
    type Output = f64;

    fn div(self, rhs: Self) -> f64 {
        self.0 / rhs.0
    }
}

/// Allow f64 * Energy (commutative multiplication)
impl Mul<Energy> for f64 {
    type Output = Energy;

    fn mul(self, rhs: Energy) -> Energy {
        rhs * self
    }
}
