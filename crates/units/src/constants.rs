//! Physical constants in CGS units.

/// Speed of light (cm/s)
pub const C_LIGHT: f64 = 2.99792458e10;

/// Planck constant (erg s)
pub const H_PLANCK: f64 = 6.62606957e-27;

/// Reduced Planck constant (erg s)
pub const HBAR: f64 = H_PLANCK / (2.0 * std::f64::consts::PI);

/// Boltzmann constant (erg/K)
pub const K_BOLTZMANN: f64 = 1.380658e-16;

/// Boltzmann constant (MeV/K)
pub const K_MEV: f64 = 8.6173324e-11;

/// 1 MeV in erg
pub const MEV_TO_ERG: f64 = 1.60217733e-6;

/// 1 erg in MeV
pub const ERG_TO_MEV: f64 = 1.0 / MEV_TO_ERG;

/// Gravitational constant (cm³ g⁻¹ s⁻²)
pub const G_NEWTON: f64 = 6.67259e-8;

/// Solar mass (g)
pub const SOLAR_MASS_G: f64 = 1.99e33;
