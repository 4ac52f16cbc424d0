use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

use crate::constants::{K_BOLTZMANN, K_MEV};

/// A physical temperature quantity using f64 precision.
///
/// The `Temperature` struct represents temperature with Kelvin as the base
/// unit. Supernova-matter temperatures are conventionally quoted in MeV
/// (k_B·T); both conventions are supported, with MeV the one appearing in
/// model files and opacity tables.
///
/// # Examples
///
/// ```rust
/// use units::Temperature;
///
/// let hot = Temperature::from_mev(10.0);
/// let same = Temperature::from_kelvin(hot.to_kelvin());
///
/// assert!((same.to_mev() - 10.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Temperature(f64); // Base unit: Kelvin

impl Temperature {
    /// Creates a zero temperature value
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Temperature` from a value in Kelvin.
    pub fn from_kelvin(value: f64) -> Self {
        Self(value)
    }

    /// Creates a new `Temperature` from a value in MeV (k_B·T).
    ///
    /// Converts MeV to Kelvin: K = T_MeV / k_MeV
    pub fn from_mev(value: f64) -> Self {
        Self(value / K_MEV)
    }

    /// Returns the temperature value in Kelvin.
    pub fn to_kelvin(&self) -> f64 {
        self.0
    }

    /// Converts the temperature to MeV (k_B·T).
    pub fn to_mev(&self) -> f64 {
        self.0 * K_MEV
    }

    /// Thermal energy k_B·T in erg.
    pub fn to_erg(&self) -> f64 {
        self.0 * K_BOLTZMANN
    }

    /// Raise to integer power
    pub fn powi(&self, n: i32) -> f64 {
        self.0.powi(n)
    }
}

impl Add for Temperature {
    type Output = Temperature;

    fn add(self, rhs: Temperature) -> Temperature {
        Temperature(self.0 + rhs.0)
    }
}

impl Sub for Temperature {
    type Output = Temperature;

    fn sub(self, rhs: Temperature) -> Temperature {
        Temperature(self.0 - rhs.0)
    }
}

impl Mul<f64> for Temperature {
    type Output = Temperature;

    fn mul(self, rhs: f64) -> Temperature {
        Temperature(self.0 * rhs)
    }
}

impl Div<f64> for Temperature {
    type Output = Temperature;

    fn div(self, rhs: f64) -> Temperature {
        Temperature(self.0 / rhs)
    }
}

/// Allow f64 * Temperature (commutative multiplication)
impl Mul<Temperature> for f64 {
    type Output = Temperature;

    fn mul(self, rhs: Temperature) -> Temperature {
        rhs * self
    }
}
