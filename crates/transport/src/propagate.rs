//! The packet loop: event selection, geodesic moves, tallies, boundaries.
//!
//! Each packet is copied into an [`EinsteinHelper`], stepped until its fate
//! is terminal (or its ct budget runs out), and copied back. Worker threads
//! fill private scratch tallies and split lists, merged after each pass;
//! because splits append to the pool, the outer loop re-passes until the
//! pool stops growing.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use spacetime::{fourvec, Grid};
use units::constants::{C_LIGHT, H_PLANCK};

use crate::config::TransportConfig;
use crate::helper::EinsteinHelper;
use crate::opacity::OpacityTable;
use crate::packet::{Fate, Packet};
use crate::randomwalk::RandomWalkCdf;
use crate::rng;
use crate::scatter::{event_interact, window};
use crate::species::Species;
use crate::tally::Tally;

pub(crate) const TINY: f64 = 1e-10;

/// ħc in erg·cm: converts a tetrad wavevector component into energy/momentum.
pub(crate) const HBAR_C: f64 = H_PLANCK * C_LIGHT / (2.0 * std::f64::consts::PI);

/// Immutable per-step view shared by emission and propagation.
pub(crate) struct Context<'a, G> {
    pub grid: &'a G,
    pub species: &'a [Species],
    pub opac: &'a OpacityTable,
    pub config: &'a TransportConfig,
    pub randomwalk: Option<&'a RandomWalkCdf>,
}

impl<G> Clone for Context<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<G> Copy for Context<'_, G> {}

/// Per-thread accumulation: a private tally plus packets spawned by splits.
pub(crate) struct Scratch {
    pub tally: Tally,
    pub splits: Vec<Packet>,
}

impl Scratch {
    pub fn fresh(template: &Tally) -> Self {
        Self {
            tally: template.fresh(),
            splits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    ZoneEdge,
    Interact,
}

/// Propagate every packet in `particles[start..]` until it is terminal or
/// its time slot reaches `ct_max`. Splits grow the pool, so passes repeat
/// until it stops growing.
pub(crate) fn propagate_all<G: Grid>(
    ctx: Context<G>,
    particles: &mut Vec<Packet>,
    tally: &mut Tally,
    pool_count: &AtomicUsize,
    ct_max: f64,
) {
    let mut start = 0;
    loop {
        let end = particles.len();
        if start >= end {
            break;
        }

        let template = tally.fresh();
        let scratch = particles[start..end]
            .par_iter_mut()
            .fold(
                || Scratch::fresh(&template),
                |mut sc, p| {
                    sc.tally.n_active[p.species] += 1;
                    if p.fate == Fate::Moving {
                        propagate(ctx, p, &mut sc, pool_count, ct_max);
                    }
                    if p.fate == Fate::Escaped {
                        record_escape(p, &mut sc.tally);
                    }
                    debug_assert!(p.fate != Fate::Moving || p.x[3] >= ct_max);
                    sc
                },
            )
            .reduce(
                || Scratch::fresh(&template),
                |mut a, b| {
                    a.tally.merge(&b.tally);
                    a.splits.extend(b.splits);
                    a
                },
            );

        tally.merge(&scratch.tally);
        particles.extend(scratch.splits);
        start = end;
    }
}

/// Accumulate the conservation audit over the finished pool.
pub(crate) fn audit_pool(particles: &[Packet], tally: &mut Tally) {
    for p in particles {
        let e = p.lab_energy();
        match p.fate {
            Fate::Rouletted => tally.rouletted_energy += e,
            Fate::Escaped => {
                tally.total_energy += e;
                tally.escape_energy += e;
            }
            Fate::Absorbed => {
                tally.total_energy += e;
                tally.core_abs_energy += e;
            }
            Fate::Moving => tally.total_energy += e,
        }
    }
}

/// Drive one packet until a terminal fate or the ct budget.
fn propagate<G: Grid>(
    ctx: Context<G>,
    p: &mut Packet,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
    ct_max: f64,
) {
    // the stream phase folds in the starting time slot so a packet resumed
    // under a later budget draws fresh numbers
    let phase = rng::PHASE_PROPAGATE ^ p.x[3].to_bits();
    let mut rng = rng::stream(ctx.config.seed, p.id, phase);

    let mut eh = EinsteinHelper::new(*p, ctx.grid, ctx.opac);
    if eh.p.fate == Fate::Moving && eh.z_ind.is_none() {
        boundary_conditions(ctx, &mut eh);
    }

    while eh.p.fate == Fate::Moving && eh.p.x[3] < ct_max {
        eh.refresh_opacity(ctx.opac);

        let event = which_event(ctx, &mut eh);

        if eh.z_ind.is_some() {
            tally_radiation(ctx, &eh, &mut sc.tally);
        }

        move_packet(ctx, &mut eh, &mut rng, sc, pool_count);
        if eh.p.fate == Fate::Moving {
            boundary_conditions(ctx, &mut eh);
        }
        if eh.p.fate == Fate::Moving && event == Event::Interact {
            event_interact(ctx, &mut eh, &mut rng, sc, pool_count);
        }
    }

    *p = eh.p;
}

/// Pick the next event from the two candidate comoving distances: the
/// zone-edge step and the interaction point where τ runs out.
pub(crate) fn which_event<G: Grid>(ctx: Context<G>, eh: &mut EinsteinHelper) -> Event {
    debug_assert!(eh.p.n > 0.0);
    let z = eh.z_ind.expect("event selection needs an interior zone");

    let d_zone_min = ctx.config.step_size * ctx.grid.zone_min_length(z);
    let d_zone_boundary = ctx.grid.zone_cell_dist(&eh.p.x, z) + TINY * d_zone_min;
    let mut d_zone = d_zone_min.max(d_zone_boundary);
    // convert the lab distance to the comoving frame
    d_zone *= eh.g.dot4(&eh.u, &eh.p.k) / eh.g.ndot(&eh.p.k);
    debug_assert!(d_zone > 0.0);

    let mut kappa_rel = eh.scatopac;
    if ctx.config.exponential_decay {
        kappa_rel += eh.absopac;
    }
    let d_interact = if kappa_rel == 0.0 {
        f64::INFINITY
    } else {
        eh.p.tau / kappa_rel
    };
    debug_assert!(d_interact >= 0.0);

    if d_interact <= d_zone {
        eh.ds_com = d_interact;
        Event::Interact
    } else {
        eh.ds_com = d_zone;
        Event::ZoneEdge
    }
}

/// Deposit this sub-step's contribution to the zone's distribution moments,
/// the absorbed four-force, and the lepton-number exchange.
pub(crate) fn tally_radiation<G: Grid>(ctx: Context<G>, eh: &EinsteinHelper, tally: &mut Tally) {
    let z = eh.z_ind.expect("tallies only accumulate in interior zones");
    debug_assert!(eh.ds_com >= 0.0);
    debug_assert!(eh.p.n > 0.0);

    let nu = eh.nu();
    let hnu = nu * H_PLANCK;
    let decay = 1.0 - (-eh.absopac * eh.ds_com).exp();
    let g_bin = ctx.opac.nu_axis().bin_clamped(nu);
    let s = eh.p.species;

    // path-length estimator of the distribution function; in
    // exponential-decay mode the path is the analytic optical-depth integral
    let path = if ctx.config.exponential_decay && eh.absopac > 0.0 {
        eh.p.n / eh.absopac * decay
    } else {
        eh.p.n * eh.ds_com
    };
    debug_assert!(path.is_finite());
    tally.distribution[s].count(&eh.kup_tet, &eh.p.x, z, g_bin, path * hnu);

    // energy-momentum absorbed by the fluid, in the comoving tetrad frame
    let absorbed = if ctx.config.exponential_decay {
        eh.p.n * decay
    } else {
        eh.p.n * eh.absopac * eh.ds_com
    };
    for i in 0..4 {
        tally.fourforce_abs[z][i] += eh.kup_tet[i] * HBAR_C * absorbed;
    }

    let lepton = ctx.species[s].lepton_number;
    if lepton != 0 {
        tally.l_abs[z] += absorbed * lepton as f64;
    }
}

/// Integrate the geodesic by `ds_com`, pay down τ, and (in exponential
/// mode) attenuate the packet.
pub(crate) fn move_packet<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    rng: &mut rand_chacha::ChaChaRng,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
) {
    debug_assert!(eh.p.tau >= 0.0);
    debug_assert!(eh.ds_com >= 0.0);

    let dlambda = eh.ds_com / eh.kup_tet[3];
    ctx.grid.geodesic_step(&mut eh.p.x, &mut eh.p.k, dlambda);

    let mut kappa_rel = eh.scatopac;
    if ctx.config.exponential_decay {
        kappa_rel += eh.absopac;
    }
    if kappa_rel > 0.0 {
        let old_tau = eh.p.tau;
        let new_tau = old_tau - kappa_rel * eh.ds_com;
        debug_assert!(new_tau >= -TINY * old_tau.max(1.0));
        eh.p.tau = new_tau.max(0.0);
    }

    if ctx.config.exponential_decay {
        eh.p.n *= (-eh.absopac * eh.ds_com).exp();
        window(ctx, eh, rng, sc, pool_count);
    }

    if eh.p.fate == Fate::Moving {
        eh.update(ctx.grid, ctx.opac);
    }
}

/// Core absorption, reflecting walls, escape.
pub(crate) fn boundary_conditions<G: Grid>(ctx: Context<G>, eh: &mut EinsteinHelper) {
    debug_assert!(eh.p.fate == Fate::Moving);

    let r_core = ctx.config.r_core.to_cm();
    if r_core > 0.0 && fourvec::radius(&eh.p.x) < r_core {
        eh.p.fate = Fate::Absorbed;
        return;
    }

    if eh.z_ind.is_none() {
        // overshoot tolerance covers both zone-edge steps and random-walk
        // displacements
        let tol = 1.0 + ctx.config.step_size.max(ctx.config.randomwalk_sphere_size);
        ctx.grid
            .reflect_boundaries(&mut eh.p.x, &mut eh.p.k, tol);
        eh.update(ctx.grid, ctx.opac);
        if eh.z_ind.is_none() {
            eh.p.fate = Fate::Escaped;
        }
    }
}

/// Escape bookkeeping: counters, escaped luminosity, and the escape
/// spectrum, binned in the lab frame.
fn record_escape(p: &Packet, tally: &mut Tally) {
    let s = p.species;
    let nu = p.lab_frequency();
    let e = p.lab_energy();
    let d = p.direction();

    tally.n_escape[s] += 1;
    tally.n_escape_num[s] += p.n;
    tally.l_escape[s] += e;
    tally.spectrum[s].count(&d, nu, e);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;
    use spacetime::{Axis, Grid1DSphere};
    use units::{Density, Temperature};

    fn vacuum_ctx() -> (Grid1DSphere, OpacityTable, Vec<Species>, TransportConfig) {
        let grid = Grid1DSphere::uniform(
            Axis::new(0.0, 1.0e6, 10),
            Density::from_grams_per_cm3(0.0),
            Temperature::from_mev(1.0),
            0.5,
        );
        let opac = OpacityTable::new(Axis::new(0.0, 1.0e22, 4), 1, 10);
        let species = vec![Species::heavy_lepton(Temperature::from_mev(1.0))];
        let config = TransportConfig::default();
        (grid, opac, species, config)
    }

    fn launch(nu: f64) -> Packet {
        let k0 = nu * 2.0 * std::f64::consts::PI / C_LIGHT;
        Packet {
            x: Vector4::new(1.0e3, 0.0, 0.0, 0.0),
            k: Vector4::new(k0, 0.0, 0.0, k0),
            n: 1.0e30,
            tau: 5.0,
            species: 0,
            id: 1,
            fate: Fate::Moving,
        }
    }

    #[test]
    fn zero_opacity_packet_moves_in_a_straight_line_at_c() {
        let (grid, opac, species, config) = vacuum_ctx();
        let ctx = Context {
            grid: &grid,
            species: &species,
            opac: &opac,
            config: &config,
            randomwalk: None,
        };

        let mut particles = vec![launch(5.0e21)];
        let mut tally = Tally::new(1, 10, opac.nu_axis(), true, 10, 1);
        let pool = AtomicUsize::new(1);
        let e0 = particles[0].lab_energy();

        propagate_all(ctx, &mut particles, &mut tally, &pool, f64::INFINITY);

        let p = &particles[0];
        assert_eq!(p.fate, Fate::Escaped);
        // straight line along +x: y and z untouched
        assert_relative_eq!(p.x[1], 0.0);
        assert_relative_eq!(p.x[2], 0.0);
        // moved at c: path length equals the accumulated ct
        assert_relative_eq!(p.x[0] - 1.0e3, p.x[3], max_relative = 1e-12);
        // energy unchanged, all of it escaped
        assert_relative_eq!(p.lab_energy(), e0, max_relative = 1e-12);
        assert_relative_eq!(tally.l_escape[0], e0, max_relative = 1e-12);
        assert_eq!(tally.n_escape[0], 1);
    }

    #[test]
    fn ct_budget_pauses_a_packet_mid_flight() {
        let (grid, opac, species, config) = vacuum_ctx();
        let ctx = Context {
            grid: &grid,
            species: &species,
            opac: &opac,
            config: &config,
            randomwalk: None,
        };

        let mut particles = vec![launch(5.0e21)];
        let mut tally = Tally::new(1, 10, opac.nu_axis(), true, 10, 1);
        let pool = AtomicUsize::new(1);

        propagate_all(ctx, &mut particles, &mut tally, &pool, 3.0e5);

        let p = &particles[0];
        assert_eq!(p.fate, Fate::Moving);
        assert!(p.x[3] >= 3.0e5);
        // overshoot is bounded by one zone step
        assert!(p.x[3] < 3.0e5 + 1.0e5 + 1.0);
    }

    #[test]
    fn interaction_event_fires_when_tau_runs_out() {
        let (grid, _, species, config) = vacuum_ctx();
        let opac = OpacityTable::gray(Axis::new(0.0, 1.0e22, 4), 1, 10, 0.0, 1.0e-3);
        let ctx = Context {
            grid: &grid,
            species: &species,
            opac: &opac,
            config: &config,
            randomwalk: None,
        };

        let mut p = launch(5.0e21);
        p.tau = 1.0e-5; // interaction distance 0.01 cm, far below the zone step
        let mut eh = EinsteinHelper::new(p, &grid, &opac);

        let event = which_event(ctx, &mut eh);
        assert_eq!(event, Event::Interact);
        assert_relative_eq!(eh.ds_com, 0.01, max_relative = 1e-12);

        // after the move, τ is exactly spent
        let mut rng = rng::stream(0, 0, 0);
        let mut sc = Scratch::fresh(&Tally::new(1, 10, opac.nu_axis(), true, 10, 1));
        let pool = AtomicUsize::new(1);
        move_packet(ctx, &mut eh, &mut rng, &mut sc, &pool);
        assert_eq!(eh.p.tau, 0.0);
    }

    #[test]
    fn absorption_tally_conserves_deposited_energy() {
        let (grid, _, species, mut config) = vacuum_ctx();
        config.exponential_decay = true;
        let kappa = 1.0e-4;
        let opac = OpacityTable::gray(Axis::new(0.0, 1.0e22, 4), 1, 10, kappa, 0.0);
        let ctx = Context {
            grid: &grid,
            species: &species,
            opac: &opac,
            config: &config,
            randomwalk: None,
        };

        let p = launch(5.0e21);
        let mut eh = EinsteinHelper::new(p, &grid, &opac);
        eh.ds_com = 1.0e3;

        let mut tally = Tally::new(1, 10, opac.nu_axis(), true, 10, 1);
        tally_radiation(ctx, &eh, &mut tally);

        let z = eh.z_ind.unwrap();
        let hnu = eh.nu() * H_PLANCK;
        let expected_absorbed = p.n * (1.0 - (-kappa * 1.0e3_f64).exp()) * hnu;
        // the time component of the four-force is the absorbed energy
        assert_relative_eq!(
            tally.fourforce_abs[z][3],
            expected_absorbed,
            max_relative = 1e-12
        );
        // distribution got the path-length estimate
        assert!(tally.distribution[0].total() > 0.0);
    }
}
