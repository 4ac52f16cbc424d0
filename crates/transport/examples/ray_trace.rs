//! Schwarzschild ray tracer
//!
//! Usage: cargo run -p transport --example ray_trace
//!
//! Launches an outgoing radial packet at 10 r_s and records its trajectory
//! through the Schwarzschild metric, printing ct, r, and the ratio of the
//! locally measured frequency to the lab-frame one at each sampling point.

use nalgebra::Vector4;
use spacetime::{Axis, Grid, Grid1DSchwarzschild};
use transport::{EinsteinHelper, Fate, OpacityTable, Packet, Species, Transport, TransportConfig};
use units::constants::C_LIGHT;
use units::{Frequency, Temperature};

fn main() {
    let r_s = 1.0e5;
    let grid = Grid1DSchwarzschild::new(Axis::new(2.0 * r_s, 200.0 * r_s, 2000), r_s);
    let nu_axis = Axis::new(0.0, Frequency::from_mev(100.0).to_hz(), 10);
    let opacities = OpacityTable::new(nu_axis, 1, 2000);
    let species = vec![Species::heavy_lepton(Temperature::from_mev(10.0))];
    let config = TransportConfig {
        step_size: 0.1,
        do_gr: true,
        ..Default::default()
    };
    let mut sim = Transport::new(grid, species, opacities, config).unwrap();

    // outgoing radial packet in the equatorial plane at 10 r_s
    let r0 = 10.0 * r_s;
    let x = Vector4::new(r0, 0.0, 0.0, 0.0);
    let nu0 = Frequency::from_mev(20.0).to_hz();
    let mut k = Vector4::new(nu0 * 2.0 * std::f64::consts::PI / C_LIGHT, 0.0, 0.0, 0.0);
    sim.grid.metric(&x).normalize_null(&mut k);

    sim.particles.push(Packet {
        x,
        k,
        n: 1.0,
        tau: 1.0,
        species: 0,
        id: 0,
        fate: Fate::Moving,
    });

    let eh0 = EinsteinHelper::new(sim.particles[0], &sim.grid, &sim.opacities);
    let nu_start = eh0.nu();
    println!("ct_cm,r_over_rs,nu_local_over_nu_start");
    println!("0.0,{:.4},1.00000000", r0 / r_s);

    // advance in slices of the ct budget and sample the trajectory
    let mut budget = 0.0;
    while sim.particles[0].fate == Fate::Moving {
        budget += 5.0 * r_s;
        sim.propagate_for(budget);

        let p = sim.particles[0];
        if p.fate != Fate::Moving {
            break;
        }
        let eh = EinsteinHelper::new(p, &sim.grid, &sim.opacities);
        println!(
            "{:.1},{:.4},{:.8}",
            p.x[3],
            spacetime::fourvec::radius(&p.x) / r_s,
            eh.nu() / nu_start
        );
    }

    let p = sim.particles[0];
    eprintln!(
        "Packet {:?} at r = {:.1} r_s after ct = {:.3e} cm",
        p.fate,
        spacetime::fourvec::radius(&p.x) / r_s,
        p.x[3]
    );
}
