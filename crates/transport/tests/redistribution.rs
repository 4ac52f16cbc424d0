//! Inelastic-scattering redistribution: packets repeatedly sampled through a
//! detailed-balance kernel must settle into the kernel's stationary
//! spectrum.
//!
//! The kernel is built as φ₀(g→g') ∝ w(g') with w the thermal weight
//! ν²·exp(−hν/kT), so a single scattering already draws the outgoing bin
//! from the stationary distribution π(g') ∝ w(g')Δν' and detailed balance
//! π(g)P(g→g') = π(g')P(g'→g) holds by construction.

use spacetime::{Axis, Grid1DSphere};
use transport::{OpacityTable, Species, Transport, TransportConfig};
use units::constants::{H_PLANCK, K_BOLTZMANN};
use units::{Density, Frequency, Temperature};

#[test]
fn kernel_scattering_relaxes_to_the_detailed_balance_spectrum() {
    let temp = Temperature::from_mev(10.0);
    let temp_k = temp.to_kelvin();
    let n_bins = 15;
    let nu_axis = Axis::new(0.0, Frequency::from_mev(75.0).to_hz(), n_bins);

    let grid = Grid1DSphere::uniform(
        Axis::new(0.0, 1.0e5, 1),
        Density::from_grams_per_cm3(1e12),
        temp,
        0.3,
    )
    .with_reflecting_outer();

    // thermal weights of the stationary spectrum
    let weights: Vec<f64> = (0..n_bins)
        .map(|g| {
            let nu = nu_axis.mid[g];
            nu * nu * (-H_PLANCK * nu / (K_BOLTZMANN * temp_k)).exp()
        })
        .collect();
    let weight_norm: f64 = (0..n_bins).map(|g| weights[g] * nu_axis.delta(g)).sum();

    // detailed-balance kernel with total scattering opacity κₛ = 10⁻² cm⁻¹
    let kappa_scat = 1.0e-2;
    let phi0 = vec![vec![
        (0..n_bins)
            .map(|g_out| kappa_scat * weights[g_out] / weight_norm)
            .collect::<Vec<f64>>();
        n_bins
    ]];

    let mut opacities = OpacityTable::new(nu_axis.clone(), 1, 1);
    opacities.set_scattering_kernel(0, phi0, None);
    // flat emission spectrum so the test starts far from equilibrium;
    // absorption is switched off again right after emission
    for g in 0..n_bins {
        opacities.set_occupation(0, 0, g, 1.0);
        opacities.set_absorption(0, 0, g, 1.0 / units::constants::C_LIGHT);
    }

    let species = vec![Species::heavy_lepton(temp)];
    let config = TransportConfig {
        n_emit_zones_per_bin: 4000,
        use_scattering_kernels: true,
        reflect_outer: true,
        ..Default::default()
    };
    let mut sim = Transport::new(grid, species, opacities, config).unwrap();

    sim.emit().unwrap();
    for g in 0..n_bins {
        sim.opacities.set_absorption(0, 0, g, 0.0);
    }

    // ~10 scatterings per packet at a mean free path of 100 cm
    sim.propagate_for(1000.0);
    sim.record_current_distribution();

    let energy_by_bin = sim.tally.distribution[0].energy_by_bin();
    let total: f64 = energy_by_bin.iter().sum();
    assert!(total > 0.0);

    // expected energy per bin of the stationary spectrum: ∫ φ₀(ν)·hν dν over
    // the bin, with φ₀ read through the same within-bin interpolation the
    // outgoing-frequency sampler reweights by
    let expected: Vec<f64> = (0..n_bins)
        .map(|g| {
            let sub = 50;
            let dnu = nu_axis.delta(g) / sub as f64;
            (0..sub)
                .map(|i| {
                    let nu = nu_axis.bottom(g) + (i as f64 + 0.5) * dnu;
                    sim.opacities.phi0_at(0, 0, 0, nu) * nu * H_PLANCK * dnu
                })
                .sum()
        })
        .collect();
    let expected_total: f64 = expected.iter().sum();

    for g in 0..n_bins {
        let expected_frac = expected[g] / expected_total;
        if expected_frac < 0.04 {
            continue;
        }
        let measured_frac = energy_by_bin[g] / total;
        let error = (measured_frac - expected_frac).abs() / expected_frac;
        assert!(
            error < 0.03,
            "bin {g}: fraction {measured_frac:.4} vs {expected_frac:.4} ({:.2}% off)",
            error * 100.0
        );
    }
}
