use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

pub const KM_TO_CM: f64 = 1e5;
pub const M_TO_CM: f64 = 1e2;

/// Schwarzschild radius of the sun in cm: r_s = 2GM☉/c²
pub const SOLAR_SCHWARZSCHILD_CM: f64 = 2.95e5;

/// A physical length quantity using f64 precision.
///
/// The `Length` struct represents length values with centimeters as the base
/// unit. CGS is the natural choice for radiation transport, where opacities
/// are tabulated in cm⁻¹ and stellar cores span 10⁵–10⁸ cm.
///
/// # Examples
///
/// ```rust
/// use units::Length;
///
/// // Create lengths using different units
/// let core_radius = Length::from_km(10.0);
/// let zone_width = Length::from_cm(1e5);
///
/// // Convert between units
/// let radius_in_cm = core_radius.to_cm();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Length(f64); // Base unit: cm

impl Length {
    /// Creates a zero length value
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Creates a new `Length` from a value in centimeters.
    pub fn from_cm(value: f64) -> Self {
        Self(value)
    }

    /// Creates a new `Length` from a value in meters.
    pub fn from_meters(value: f64) -> Self {
        Self(value * M_TO_CM)
    }

    /// Creates a new `Length` from a value in kilometers.
    pub fn from_km(value: f64) -> Self {
        Self(value * KM_TO_CM)
    }

    /// Returns the length in centimeters.
    pub fn to_cm(&self) -> f64 {
        self.0
    }

    /// Converts the length to meters.
    pub fn to_meters(&self) -> f64 {
        self.0 / M_TO_CM
    }

    /// Converts the length to kilometers.
    pub fn to_km(&self) -> f64 {
        self.0 / KM_TO_CM
    }

    /// Returns the minimum of two lengths.
    pub fn min(self, other: Self) -> Self {
        if self.0 < other.0 {
            self
        } else {
            other
        }
    }

    /// Returns the maximum of two lengths.
    pub fn max(self, other: Self) -> Self {
        if self.0 > other.0 {
            self
        } else {
            other
        }
    }

    /// Raise to integer power (returns dimensionless f64 for dimensional consistency)
    pub fn powi(&self, n: i32) -> f64 {
        self.0.powi(n)
    }

    /// Square root
    pub fn sqrt(&self) -> f64 {
        self.0.sqrt()
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length(self.0 + rhs.0)
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length(self.0 - rhs.0)
    }
}

impl Mul<f64> for Length {
    type Output = Length;

    fn mul(self, rhs: f64) -> Length {
        Length(self.0 * rhs)
    }
}

impl Div<f64> for Length {
    type Output = Length;

    fn div(self, rhs: f64) -> Length {
        Length(self.0 / rhs)
    }
}

/// Division of Length by Length returns a dimensionless ratio
impl Div for Length {
    type Output = f64;

    fn div(self, rhs: Self) -> f64 {
        self.0 / rhs.0
    }
}

/// Allow f64 * Length (commutative multiplication)
impl Mul<Length> for f64 {
    type Output = Length;

    fn mul(self, rhs: Length) -> Length {
        rhs * self
    }
}
