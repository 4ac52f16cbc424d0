//! Packet creation: the inner core surface and the thermal zones.
//!
//! Emission sites are enumerated globally, (species, bin, sample) for the
//! core and (zone, species, bin, sample) for the fluid, so every packet's
//! RNG stream id is independent of the rank layout and thread count. Zones are
//! partitioned round-robin across ranks. Each created packet is windowed at
//! birth, so hopeless low-weight packets are rouletted before they ever
//! enter the pool.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use rayon::prelude::*;
use spacetime::{isotropic_kup_tet, Grid, Tetrad};
use units::constants::C_LIGHT;

use crate::blackbody::number_blackbody;
use crate::helper::EinsteinHelper;
use crate::packet::{Fate, Packet};
use crate::propagate::{Context, Scratch, HBAR_C};
use crate::rng::{sample_tau, stream, PHASE_EMIT};
use crate::scatter::window;
use crate::tally::Tally;
use crate::Error;

/// What one emission phase did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionStats {
    /// Packets attempted (before birth windowing)
    pub attempted: usize,
    /// Packets that made it into the pool
    pub created: usize,
}

impl EmissionStats {
    fn add(mut self, other: Self) -> Self {
        self.attempted += other.attempted;
        self.created += other.created;
        self
    }
}

/// Emit this step's packets from the core surface and the thermal zones.
///
/// Fails before creating anything if the planned emission could overflow
/// `max_particles`.
pub(crate) fn emit_packets<G: Grid>(
    ctx: Context<G>,
    rank: usize,
    n_ranks: usize,
    step_index: u64,
    particles: &mut Vec<Packet>,
    tally: &mut Tally,
    pool_count: &AtomicUsize,
) -> Result<EmissionStats, Error> {
    let n_nu = ctx.opac.nu_axis().len();
    let n_species = ctx.species.len();
    let n_zones = ctx.grid.n_zones();

    let core_sites = ctx.config.n_emit_core_per_bin * n_species * n_nu;
    let zone_sites = ctx.config.n_emit_zones_per_bin * n_species * n_nu * n_zones;
    let n_emit = core_sites + zone_sites;

    if particles.len() + n_emit > ctx.config.max_particles {
        return Err(Error::TooManyPackets {
            current: particles.len(),
            requested: n_emit,
            max: ctx.config.max_particles,
        });
    }

    // globally unique, rank-independent stream ids for this step
    let id_base = step_index.wrapping_mul(n_emit as u64);

    let mut stats = EmissionStats::default();
    if ctx.config.n_emit_core_per_bin > 0 && ctx.config.r_core.to_cm() > 0.0 {
        stats = stats.add(emit_inner_source_by_bin(
            ctx, id_base, particles, tally, pool_count,
        ));
    }
    if ctx.config.n_emit_zones_per_bin > 0 {
        stats = stats.add(emit_zones_by_bin(
            ctx,
            rank,
            n_ranks,
            id_base + core_sites as u64,
            particles,
            tally,
            pool_count,
        ));
    }

    tracing::debug!(
        attempted = stats.attempted,
        created = stats.created,
        rouletted_at_birth = stats.attempted - stats.created,
        "emitted packets"
    );
    Ok(stats)
}

/// Blackbody emission from the core surface, by (species, frequency bin).
fn emit_inner_source_by_bin<G: Grid>(
    ctx: Context<G>,
    id_base: u64,
    particles: &mut Vec<Packet>,
    tally: &mut Tally,
    pool_count: &AtomicUsize,
) -> EmissionStats {
    let n_nu = ctx.opac.nu_axis().len();
    let per_bin = ctx.config.n_emit_core_per_bin;
    let n_sites = ctx.species.len() * n_nu * per_bin;
    let weight = 1.0 / per_bin as f64;

    let template = tally.fresh();
    let (scratch, stats) = (0..n_sites)
        .into_par_iter()
        .fold(
            || (Scratch::fresh(&template), EmissionStats::default()),
            |(mut sc, mut st), site| {
                let s = site / (n_nu * per_bin);
                let g = (site / per_bin) % n_nu;
                st.attempted += 1;
                if create_surface_packet(ctx, s, g, weight, id_base + site as u64, &mut sc, pool_count)
                {
                    st.created += 1;
                }
                (sc, st)
            },
        )
        .reduce(
            || (Scratch::fresh(&template), EmissionStats::default()),
            |(mut a, sa), (b, sb)| {
                a.tally.merge(&b.tally);
                a.splits.extend(b.splits);
                (a, sa.add(sb))
            },
        );

    tally.merge(&scratch.tally);
    particles.extend(scratch.splits);
    stats
}

/// Thermal emission from the fluid, by (zone, species, frequency bin), with
/// zones dealt round-robin across ranks and the region inside the core
/// excluded.
fn emit_zones_by_bin<G: Grid>(
    ctx: Context<G>,
    rank: usize,
    n_ranks: usize,
    id_base: u64,
    particles: &mut Vec<Packet>,
    tally: &mut Tally,
    pool_count: &AtomicUsize,
) -> EmissionStats {
    let n_nu = ctx.opac.nu_axis().len();
    let per_bin = ctx.config.n_emit_zones_per_bin;
    let sites_per_zone = ctx.species.len() * n_nu * per_bin;
    let n_sites = ctx.grid.n_zones() * sites_per_zone;
    let weight = 1.0 / per_bin as f64;
    let r_core = ctx.config.r_core.to_cm();

    let template = tally.fresh();
    let (scratch, stats) = (0..n_sites)
        .into_par_iter()
        .fold(
            || (Scratch::fresh(&template), EmissionStats::default()),
            |(mut sc, mut st), site| {
                let z = site / sites_per_zone;
                if z % n_ranks != rank || ctx.grid.zone_radius(z) < r_core {
                    return (sc, st);
                }
                let within = site % sites_per_zone;
                let s = within / (n_nu * per_bin);
                let g = (within / per_bin) % n_nu;
                st.attempted += 1;
                if create_thermal_packet(
                    ctx,
                    z,
                    s,
                    g,
                    weight,
                    id_base + site as u64,
                    &mut sc,
                    pool_count,
                ) {
                    st.created += 1;
                }
                (sc, st)
            },
        )
        .reduce(
            || (Scratch::fresh(&template), EmissionStats::default()),
            |(mut a, sa), (b, sb)| {
                a.tally.merge(&b.tally);
                a.splits.extend(b.splits);
                (a, sa.add(sb))
            },
        );

    tally.merge(&scratch.tally);
    particles.extend(scratch.splits);
    stats
}

/// Create one packet on the core surface: position uniform on the sphere,
/// direction uniform in the outward hemisphere, frequency uniform in ν³
/// within the bin.
fn create_surface_packet<G: Grid>(
    ctx: Context<G>,
    s: usize,
    g: usize,
    weight: f64,
    id: u64,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
) -> bool {
    let mut rng = stream(ctx.config.seed, id, PHASE_EMIT);
    let axis = ctx.opac.nu_axis();
    let r_core = ctx.config.r_core.to_cm();

    let (x, d) = ctx.grid.random_core_x_d(r_core, &mut rng);

    // frequency uniform in ν³ matches the isotropic blackbody bin weighting
    let nu3_min = axis.bottom(g).powi(3);
    let nu3_max = axis.top[g].powi(3);
    let nu = (nu3_min + (nu3_max - nu3_min) * rng.random::<f64>()).cbrt();

    let k0 = nu * 2.0 * std::f64::consts::PI / C_LIGHT;
    let mut k = nalgebra::Vector4::new(d[0] * k0, d[1] * k0, d[2] * k0, k0);
    ctx.grid.metric(&x).normalize_null(&mut k);

    let sp = &ctx.species[s];
    let multiplier = ctx.config.core_lum_multiplier * sp.weight;
    let n = number_blackbody(sp.t_core.to_kelvin(), sp.mu_core.to_erg(), nu) // #/s/cm²/sr/(Hz³/3)
        * (4.0 * std::f64::consts::PI * r_core * r_core) //            cm²
        * std::f64::consts::PI //                                          sr
        * axis.delta3(g) / 3.0 //                                             Hz³/3
        * multiplier
        * weight;
    if n <= 0.0 {
        return false;
    }

    let p = Packet {
        x,
        k,
        n,
        tau: 0.0,
        species: s,
        id,
        fate: Fate::Moving,
    };
    let mut eh = EinsteinHelper::new(p, ctx.grid, ctx.opac);
    debug_assert!(eh.z_ind.is_some());

    eh.p.tau = sample_tau(&mut rng);
    window(ctx, &mut eh, &mut rng, sc, pool_count);

    if eh.p.fate == Fate::Moving {
        sc.tally.n_core_lab[s] += eh.p.n;
        sc.splits.push(eh.p);
        pool_count.fetch_add(1, Ordering::Relaxed);
        true
    } else {
        false
    }
}

/// Create one thermal packet in zone `z`: position uniform by comoving
/// volume, direction isotropic in the tetrad, frequency uniform within the
/// bin.
fn create_thermal_packet<G: Grid>(
    ctx: Context<G>,
    z: usize,
    s: usize,
    g: usize,
    weight: f64,
    id: u64,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
) -> bool {
    let mut rng = stream(ctx.config.seed, id, PHASE_EMIT);
    let axis = ctx.opac.nu_axis();

    let x = ctx.grid.sample_in_zone(z, &mut rng);
    let nu = axis.bottom(g) + axis.delta(g) * rng.random::<f64>();

    let n = ctx.opac.occupation(s, z, nu)
        * ctx.opac.absorption(s, z, nu)
        * weight / (C_LIGHT * C_LIGHT)
        * 4.0 * std::f64::consts::PI
        * axis.delta3(g) / 3.0
        * ctx.grid.zone_com_volume(z);
    if n <= 0.0 {
        return false;
    }

    // emit isotropically in the comoving frame
    let g_metric = ctx.grid.metric(&x);
    let u = ctx.grid.fluid_4velocity(&x, z);
    let tetrad = Tetrad::comoving(&g_metric, &u);
    let kup_tet = isotropic_kup_tet(nu, &mut rng);
    let k = tetrad.tetrad_to_coord(&kup_tet);

    let p = Packet {
        x,
        k,
        n,
        tau: 0.0,
        species: s,
        id,
        fate: Fate::Moving,
    };
    let mut eh = EinsteinHelper::new(p, ctx.grid, ctx.opac);
    debug_assert_eq!(eh.z_ind, Some(z));

    eh.p.tau = sample_tau(&mut rng);
    window(ctx, &mut eh, &mut rng, sc, pool_count);

    if eh.p.fate == Fate::Moving {
        sc.tally.n_emit_lab[s] += eh.p.n;
        let lepton = ctx.species[s].lepton_number;
        if lepton != 0 {
            sc.tally.l_emit[z] += eh.p.n * lepton as f64;
        }
        for i in 0..4 {
            sc.tally.fourforce_emit[z][i] -= kup_tet[i] * HBAR_C * eh.p.n;
        }
        sc.splits.push(eh.p);
        pool_count.fetch_add(1, Ordering::Relaxed);
        true
    } else {
        false
    }
}
