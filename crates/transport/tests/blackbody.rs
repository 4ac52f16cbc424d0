//! Blackbody equilibrium: thermal emission against thermal absorption must
//! reproduce the Fermi–Dirac number density, species by species.
//!
//! With the path-length estimator, a packet emitted with
//! N ∝ f·κₐ·Δ(ν³)/3·V and absorbed to exhaustion deposits N·hν/κₐ, so the
//! accumulated energy tally divided by hν̄·c·V recovers the equilibrium
//! number density (4π/c³)·f·Δ(ν³)/3, independent of κₐ.

use spacetime::{Axis, Grid1DSphere};
use transport::blackbody::equilibrium_number_density;
use transport::{OpacityTable, Species, Transport, TransportConfig};
use units::constants::{C_LIGHT, H_PLANCK};
use units::{Density, Energy, Frequency, Temperature};

#[test]
fn equilibrium_number_density_matches_fermi_dirac() {
    let temp = Temperature::from_mev(10.0);
    let temp_k = temp.to_kelvin();
    let kappa_abs = 1.0e-3;
    let radius = 1.0e5;

    let grid = Grid1DSphere::uniform(
        Axis::new(0.0, radius, 1),
        Density::from_grams_per_cm3(1e12),
        temp,
        0.1,
    )
    .with_reflecting_outer();

    let nu_axis = Axis::new(0.0, Frequency::from_mev(100.0).to_hz(), 20);
    let mut opacities = OpacityTable::gray(nu_axis.clone(), 2, 1, kappa_abs, 0.0);
    opacities.fill_thermal_occupation(0, &[temp_k], &[0.0]);
    opacities.fill_thermal_occupation(1, &[temp_k], &[0.0]);

    let species = vec![
        Species::electron_neutrino(temp, Energy::zero()),
        Species::electron_antineutrino(temp, Energy::zero()),
    ];

    // roulette threshold far below the typical packet weight, so essentially
    // all of each packet is deposited before the coin flips
    let volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
    let peak_n = 0.5
        * kappa_abs
        * (4.0 * std::f64::consts::PI / (C_LIGHT * C_LIGHT))
        * nu_axis.delta3(5) / 3.0
        * volume;

    let config = TransportConfig {
        n_emit_zones_per_bin: 500,
        exponential_decay: true,
        min_packet_number: 1.0e-10 * peak_n,
        reflect_outer: true,
        ..Default::default()
    };
    let mut sim = Transport::new(grid, species, opacities, config).unwrap();

    sim.emit().unwrap();
    sim.propagate_for(f64::INFINITY);

    let expected = equilibrium_number_density(temp_k, 0.0, &nu_axis);

    for s in 0..2 {
        let energy_by_bin = sim.tally.distribution[s].energy_by_bin();

        let mut measured = 0.0;
        for g in 0..nu_axis.len() {
            let hnu = nu_axis.mid[g] * H_PLANCK;
            measured += energy_by_bin[g] / hnu;
        }
        measured /= C_LIGHT * volume;

        let error = (measured - expected).abs() / expected;
        assert!(
            error < 0.02,
            "species {s}: number density {measured:e} vs Fermi–Dirac {expected:e} ({:.2}% off)",
            error * 100.0
        );
    }

    // per-bin agreement where the statistics are solid
    let energy_by_bin = sim.tally.distribution[0].energy_by_bin();
    let total: f64 = energy_by_bin.iter().sum();
    for g in 0..nu_axis.len() {
        if energy_by_bin[g] < 0.05 * total {
            continue;
        }
        let hnu = nu_axis.mid[g] * H_PLANCK;
        let measured = energy_by_bin[g] / hnu / (C_LIGHT * volume);
        let f = transport::blackbody::fermi_dirac_occupation(nu_axis.mid[g], temp_k, 0.0);
        let expected_bin =
            4.0 * std::f64::consts::PI / C_LIGHT.powi(3) * f * nu_axis.delta3(g) / 3.0;
        let error = (measured - expected_bin).abs() / expected_bin;
        assert!(
            error < 0.03,
            "bin {g}: {measured:e} vs {expected_bin:e} ({:.2}% off)",
            error * 100.0
        );
    }
}
