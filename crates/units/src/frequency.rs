use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::constants::{H_PLANCK, MEV_TO_ERG};
use crate::energy::Energy;

/// A physical frequency quantity using f64 precision.
///
/// Base unit is the Hz. A 1 MeV neutrino has ν ≈ 2.4×10²⁰ Hz, so the
/// transport frequency grid typically spans 10²⁰–10²² Hz.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Frequency(f64); // Base unit: Hz

impl Frequency {
    /// Creates a zero frequency value
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Frequency` from a value in Hz.
    pub fn from_hz(value: f64) -> Self {
        Self(value)
    }

    /// Creates a new `Frequency` from a quantum energy in MeV: ν = E/h.
    pub fn from_mev(value: f64) -> Self {
        Self(value * MEV_TO_ERG / H_PLANCK)
    }

    /// Returns the frequency in Hz.
    pub fn to_hz(&self) -> f64 {
        self.0
    }

    /// The energy of a quantum at this frequency: E = hν.
    pub fn to_energy(&self) -> Energy {
        Energy::from_erg(self.0 * H_PLANCK)
    }
}

impl Add for Frequency {
    type Output = Frequency;

    fn add(self, rhs: Frequency) -> Frequency {
        Frequency(self.0 + rhs.0)
    }
}

impl Sub for Frequency {
    type Output = Frequency;

    fn sub(self, rhs: Frequency) -> Frequency {
        Frequency(self.0 - rhs.0)
    }
}

impl Mul<f64> for Frequency {
    type Output = Frequency;

    fn mul(self, rhs: f64) -> Frequency {
        Frequency(self.0 * rhs)
    }
}

impl Div<f64> for Frequency {
    type Output = Frequency;

    fn div(self, rhs: f64) -> Frequency {
        Frequency(self.0 / rhs)
    }
}

/// Division of Frequency by Frequency returns a dimensionless ratio
impl Div for Frequency {
    type Output = f64;

    fn div(self, rhs: Self) -> f64 {
        self.0 / rhs.0
    }
}

/// Allow f64 * Frequency (commutative multiplication)
impl Mul<Frequency> for f64 {
    type Output = Frequency;

    fn mul(self, rhs: Frequency) -> Frequency {
        rhs * self
    }
}
