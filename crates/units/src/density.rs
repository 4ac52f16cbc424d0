use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// A physical mass-density quantity using f64 precision.
///
/// Base unit is g/cm³. Supernova cores reach 10¹⁴ g/cm³; the neutrinosphere
/// sits near 10¹¹–10¹² g/cm³.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Density(f64); // Base unit: g/cm³

impl Density {
    /// Creates a zero density value
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Density` from a value in g/cm³.
    pub fn from_grams_per_cm3(value: f64) -> Self {
        Self(value)
    }

    /// Returns the density in g/cm³.
    pub fn to_grams_per_cm3(&self) -> f64 {
        self.0
    }

    /// log₁₀ of the density in g/cm³.
    pub fn log10(&self) -> f64 {
        self.0.log10()
    }
}

impl Add for Density {
    type Output = Density;

    fn add(self, rhs: Density) -> Density {
        Density(self.0 + rhs.0)
    }
}

impl Sub for Density {
    type Output = Density;

    fn sub(self, rhs: Density) -> Density {
        Density(self.0 - rhs.0)
    }
}

impl Mul<f64> for Density {
    type Output = Density;

    fn mul(self, rhs: f64) -> Density {
        Density(self.0 * rhs)
    }
}

impl Div<f64> for Density {
    type Output = Density;

    fn div(self, rhs: f64) -> Density {
        Density(self.0 / rhs)
    }
}

/// Allow f64 * Density (commutative multiplication)
impl Mul<Density> for f64 {
    type Output = Density;

    fn mul(self, rhs: Density) -> Density {
        rhs * self
    }
}
