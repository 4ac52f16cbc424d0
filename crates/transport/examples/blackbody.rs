//! Single-zone blackbody equilibrium scan
//!
//! Usage: cargo run -p transport --example blackbody
//!
//! Sweeps the fluid temperature of a single reflecting zone and compares
//! the transported neutrino number density against the Fermi–Dirac value,
//! one CSV row per temperature.

use spacetime::{Axis, Grid1DSphere};
use transport::blackbody::equilibrium_number_density;
use transport::{OpacityTable, Species, Transport, TransportConfig};
use units::constants::{C_LIGHT, H_PLANCK};
use units::{Density, Energy, Frequency, Temperature};

fn run_case(temp_mev: f64) -> (f64, f64) {
    let temp = Temperature::from_mev(temp_mev);
    let kappa_abs = 1.0e-3;
    let radius = 1.0e5;

    let grid = Grid1DSphere::uniform(
        Axis::new(0.0, radius, 1),
        Density::from_grams_per_cm3(1e12),
        temp,
        0.1,
    )
    .with_reflecting_outer();

    let nu_axis = Axis::new(0.0, Frequency::from_mev(10.0 * temp_mev).to_hz(), 20);
    let mut opacities = OpacityTable::gray(nu_axis.clone(), 1, 1, kappa_abs, 0.0);
    opacities.fill_thermal_occupation(0, &[temp.to_kelvin()], &[0.0]);

    let species = vec![Species::electron_neutrino(temp, Energy::zero())];

    let volume = 4.0 / 3.0 * std::f64::consts::PI * radius * radius * radius;
    let typical_n = 0.5
        * kappa_abs
        * (4.0 * std::f64::consts::PI / (C_LIGHT * C_LIGHT))
        * nu_axis.delta3(5) / 3.0
        * volume;

    let config = TransportConfig {
        n_emit_zones_per_bin: 500,
        exponential_decay: true,
        min_packet_number: 1.0e-10 * typical_n,
        reflect_outer: true,
        ..Default::default()
    };
    let mut sim = Transport::new(grid, species, opacities, config).unwrap();

    sim.emit().unwrap();
    sim.propagate_for(f64::INFINITY);

    let measured: f64 = sim.tally.distribution[0]
        .energy_by_bin()
        .iter()
        .enumerate()
        .map(|(g, e)| e / (nu_axis.mid[g] * H_PLANCK))
        .sum::<f64>()
        / (C_LIGHT * volume);
    let expected = equilibrium_number_density(temp.to_kelvin(), 0.0, &nu_axis);

    (measured, expected)
}

fn main() {
    println!("T_MeV,n_transport,n_fermi_dirac,ratio");

    for &temp_mev in &[2.0, 4.0, 6.0, 8.0, 10.0, 15.0, 20.0] {
        let (measured, expected) = run_case(temp_mev);
        println!(
            "{:.1},{:.6e},{:.6e},{:.5}",
            temp_mev,
            measured,
            expected,
            measured / expected
        );
    }

    eprintln!("Scanned 7 temperatures");
}
