//! Inelastic-scattering redistribution driver
//!
//! Usage: cargo run -p transport --example inelastic_scattering
//!
//! Emits a flat packet population into 15 energy bins, runs it through a
//! detailed-balance scattering kernel with absorption switched off, and
//! prints the relaxed energy histogram next to the stationary spectrum.

use spacetime::{Axis, Grid1DSphere};
use transport::{OpacityTable, Species, Transport, TransportConfig};
use units::constants::{C_LIGHT, H_PLANCK, K_BOLTZMANN};
use units::{Density, Frequency, Temperature};

fn main() {
    let temp = Temperature::from_mev(10.0);
    let n_bins = 15;
    let nu_axis = Axis::new(0.0, Frequency::from_mev(75.0).to_hz(), n_bins);

    let grid = Grid1DSphere::uniform(
        Axis::new(0.0, 1.0e5, 1),
        Density::from_grams_per_cm3(1e12),
        temp,
        0.3,
    )
    .with_reflecting_outer();

    // detailed-balance kernel: outgoing bins drawn from ν²exp(−hν/kT)
    let weights: Vec<f64> = (0..n_bins)
        .map(|g| {
            let nu = nu_axis.mid[g];
            nu * nu * (-H_PLANCK * nu / (K_BOLTZMANN * temp.to_kelvin())).exp()
        })
        .collect();
    let weight_norm: f64 = (0..n_bins).map(|g| weights[g] * nu_axis.delta(g)).sum();
    let kappa_scat = 1.0e-2;
    let phi0 = vec![vec![
        (0..n_bins)
            .map(|g_out| kappa_scat * weights[g_out] / weight_norm)
            .collect::<Vec<f64>>();
        n_bins
    ]];

    let mut opacities = OpacityTable::new(nu_axis.clone(), 1, 1);
    opacities.set_scattering_kernel(0, phi0, None);
    for g in 0..n_bins {
        opacities.set_occupation(0, 0, g, 1.0);
        opacities.set_absorption(0, 0, g, 1.0 / C_LIGHT);
    }

    let species = vec![Species::heavy_lepton(temp)];
    let config = TransportConfig {
        n_emit_zones_per_bin: 2000,
        use_scattering_kernels: true,
        reflect_outer: true,
        ..Default::default()
    };
    let mut sim = Transport::new(grid, species, opacities, config).unwrap();

    let stats = sim.emit().unwrap();
    eprintln!("Emitted {} packets", stats.created);

    // absorption was only there to weight the emission
    for g in 0..n_bins {
        sim.opacities.set_absorption(0, 0, g, 0.0);
    }

    sim.propagate_for(1000.0);
    sim.record_current_distribution();

    let energy_by_bin = sim.tally.distribution[0].energy_by_bin();
    let total: f64 = energy_by_bin.iter().sum();
    let expected: Vec<f64> = (0..n_bins)
        .map(|g| weights[g] * nu_axis.delta(g) * nu_axis.mid[g] * H_PLANCK / weight_norm)
        .collect();
    let expected_total: f64 = expected.iter().sum();

    println!("bin,E_mid_MeV,fraction,stationary_fraction");
    for g in 0..n_bins {
        println!(
            "{},{:.2},{:.5},{:.5}",
            g,
            Frequency::from_hz(nu_axis.mid[g]).to_energy().to_mev(),
            energy_by_bin[g] / total,
            expected[g] / expected_total
        );
    }
}
