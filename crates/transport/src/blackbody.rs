//! Fermi–Dirac blackbody helpers for neutrino emission.

use spacetime::Axis;
use units::constants::{C_LIGHT, H_PLANCK, K_BOLTZMANN};

/// Fermi–Dirac occupation f(ν; T, μ) = 1/(exp((hν − μ)/kT) + 1).
///
/// `temp_k` in Kelvin, `mu_erg` in erg. A zero temperature gives a sharp
/// Fermi surface.
pub fn fermi_dirac_occupation(nu: f64, temp_k: f64, mu_erg: f64) -> f64 {
    let e = H_PLANCK * nu - mu_erg;
    if temp_k <= 0.0 {
        return if e <= 0.0 { 1.0 } else { 0.0 };
    }
    let arg = e / (K_BOLTZMANN * temp_k);
    if arg > 700.0 {
        0.0
    } else {
        1.0 / (arg.exp() + 1.0)
    }
}

/// Number-form blackbody B_N(T, μ, ν) = f(ν; T, μ)/c².
///
/// Units: #/s/cm²/sr per (Hz³/3); multiplying by an area, π sr of outward
/// directions, and a bin's Δν³/3 yields an emission rate in neutrinos per
/// second.
pub fn number_blackbody(temp_k: f64, mu_erg: f64, nu: f64) -> f64 {
    fermi_dirac_occupation(nu, temp_k, mu_erg) / (C_LIGHT * C_LIGHT)
}

/// Equilibrium neutrino number density over a frequency grid:
/// n = (4π/c³) Σ_g f(ν̄_g) Δ(ν³)_g / 3   (#/cm³).
pub fn equilibrium_number_density(temp_k: f64, mu_erg: f64, nu_axis: &Axis) -> f64 {
    let mut sum = 0.0;
    for g in 0..nu_axis.len() {
        sum += fermi_dirac_occupation(nu_axis.mid[g], temp_k, mu_erg) * nu_axis.delta3(g) / 3.0;
    }
    4.0 * std::f64::consts::PI / C_LIGHT.powi(3) * sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use units::Temperature;

    #[test]
    fn occupation_is_half_at_the_chemical_potential() {
        let temp = Temperature::from_mev(10.0).to_kelvin();
        let mu = units::Energy::from_mev(5.0).to_erg();
        let nu_at_mu = units::Energy::from_mev(5.0).to_frequency().to_hz();

        assert_relative_eq!(fermi_dirac_occupation(nu_at_mu, temp, mu), 0.5);
    }

    #[test]
    fn occupation_decays_toward_high_frequency() {
        let temp = Temperature::from_mev(10.0).to_kelvin();
        let nu_low = units::Frequency::from_mev(1.0).to_hz();
        let nu_high = units::Frequency::from_mev(100.0).to_hz();

        let f_low = fermi_dirac_occupation(nu_low, temp, 0.0);
        let f_high = fermi_dirac_occupation(nu_high, temp, 0.0);
        assert!(f_low > f_high);
        assert!(f_high > 0.0);

        // far above kT the occupation is exponentially small
        let nu_far = units::Frequency::from_mev(10_000.0).to_hz();
        assert_eq!(fermi_dirac_occupation(nu_far, temp, 0.0), 0.0);
    }

    #[test]
    fn zero_temperature_gives_a_sharp_fermi_surface() {
        let mu = units::Energy::from_mev(5.0).to_erg();
        let below = units::Frequency::from_mev(4.9).to_hz();
        let above = units::Frequency::from_mev(5.1).to_hz();

        assert_eq!(fermi_dirac_occupation(below, 0.0, mu), 1.0);
        assert_eq!(fermi_dirac_occupation(above, 0.0, mu), 0.0);
    }

    #[test]
    fn number_density_tracks_t_cubed() {
        // n ∝ T³ for μ = 0 once the grid covers the thermal peak
        let t1 = Temperature::from_mev(4.0).to_kelvin();
        let t2 = Temperature::from_mev(8.0).to_kelvin();

        let axis1 = Axis::new(0.0, units::Frequency::from_mev(60.0).to_hz(), 400);
        let axis2 = Axis::new(0.0, units::Frequency::from_mev(120.0).to_hz(), 400);

        let n1 = equilibrium_number_density(t1, 0.0, &axis1);
        let n2 = equilibrium_number_density(t2, 0.0, &axis2);

        assert_relative_eq!(n2 / n1, 8.0, max_relative = 1e-3);
    }
}
