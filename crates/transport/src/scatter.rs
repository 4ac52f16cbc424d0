//! Interaction physics: absorption at events, scattering, the random-walk
//! diffusion approximation, and population control.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::Vector4;
use rand::Rng;
use rand_chacha::ChaChaRng;
use spacetime::{fourvec, isotropic_direction, isotropic_kup_tet, outward_hemisphere, Grid};
use units::constants::{C_LIGHT, H_PLANCK};

use crate::helper::EinsteinHelper;
use crate::packet::Fate;
use crate::propagate::{boundary_conditions, Context, Scratch, HBAR_C};
use crate::rng::{child_id, sample_tau};
use crate::tally::Tally;

/// Handle an interaction event: deposit the event's absorption fraction,
/// scatter, resample τ, and window the survivor.
pub(crate) fn event_interact<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    rng: &mut ChaChaRng,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
) {
    debug_assert!(eh.z_ind.is_some());
    debug_assert!(eh.p.n > 0.0);
    debug_assert!(eh.p.fate == Fate::Moving);

    // in non-exponential mode the absorbed fraction is handled analytically
    // here rather than continuously along the path
    if !ctx.config.exponential_decay {
        eh.p.n *= eh.scatopac / (eh.absopac + eh.scatopac);
    }

    scatter(ctx, eh, rng, sc);

    if eh.p.fate == Fate::Moving {
        eh.p.tau = sample_tau(rng);
        window(ctx, eh, rng, sc, pool_count);
    }

    debug_assert!(eh.p.fate != Fate::Moving || eh.p.n > 0.0);
}

/// Population control: roulette low-weight packets, split heavy ones.
///
/// Roulette is a fair coin: half the packets die, survivors double, so the
/// expected packet number is unchanged. Splits divide a packet into
/// equal-weight copies appended to the pool, capped by `max_particles`.
pub(crate) fn window<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    rng: &mut ChaChaRng,
    sc: &mut Scratch,
    pool_count: &AtomicUsize,
) {
    debug_assert!(eh.p.n >= 0.0);
    debug_assert!(eh.p.fate != Fate::Rouletted);

    while eh.p.n <= ctx.config.min_packet_number && eh.p.fate == Fate::Moving {
        if rng.random::<f64>() < 0.5 {
            eh.p.fate = Fate::Rouletted;
        } else {
            eh.p.n *= 2.0;
        }
    }

    let ratio = eh.p.n / ctx.config.max_packet_number;
    let n_new = if ratio.is_finite() { ratio as usize } else { 0 };
    if ratio > 1.0 && pool_count.load(Ordering::Relaxed) + n_new < ctx.config.max_particles {
        eh.p.n /= (n_new + 1) as f64;
        for i in 0..n_new {
            let mut copy = eh.p;
            copy.id = child_id(eh.p.id, i as u64);
            sc.splits.push(copy);
        }
        pool_count.fetch_add(n_new, Ordering::Relaxed);
    }

    if eh.p.fate == Fate::Moving {
        debug_assert!(eh.p.n > 0.0);
        debug_assert!(eh.p.n.is_finite());
    }
}

/// Scatter a packet: take the random-walk shortcut through
/// scattering-dominated zones when it applies, otherwise resample the
/// direction isotropically in the comoving frame (and the frequency from the
/// kernels when enabled).
pub(crate) fn scatter<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    rng: &mut ChaChaRng,
    sc: &mut Scratch,
) {
    let mut did_random_walk = false;

    if let Some(cdf) = ctx.randomwalk {
        if eh.scatopac > 0.0 {
            let z = eh.z_ind.expect("scatter requires an interior zone");
            let d_diff = C_LIGHT / (3.0 * eh.scatopac);

            // cheap gate on the lab-frame sphere before doing the full math
            let r_lab_min = ctx.config.randomwalk_sphere_size * ctx.grid.zone_min_length(z);
            let r_lab = r_lab_min.max(ctx.grid.zone_cell_dist(&eh.p.x, z));

            if eh.scatopac * r_lab >= ctx.config.randomwalk_min_optical_depth {
                let vabs = ctx.grid.fluid_velocity(&eh.p.x, z).norm();
                let gamma = eh.u[3] * eh.g.alpha;

                let r_com = if r_lab == 0.0 {
                    0.0
                } else if r_lab.is_infinite() {
                    let kappa = if eh.absopac > 0.0 { eh.absopac } else { eh.scatopac };
                    ctx.config.randomwalk_sphere_size * ctx.config.randomwalk_min_optical_depth
                        / kappa
                } else {
                    2.0 * r_lab
                        / gamma
                        / (1.0
                            + (1.0
                                + 4.0 * r_lab * vabs * ctx.config.randomwalk_max_x
                                    / (gamma * d_diff))
                                .sqrt())
                };

                if eh.scatopac * r_com >= ctx.config.randomwalk_min_optical_depth {
                    random_walk(ctx, eh, r_com, d_diff, cdf, rng, sc);
                    boundary_conditions(ctx, eh);
                    did_random_walk = true;
                }
            }
        }
    }

    if !did_random_walk && eh.p.fate == Fate::Moving {
        let kup_tet_old = eh.kup_tet;
        let n_old = eh.p.n;

        let kup_tet = isotropic_kup_tet(eh.nu(), rng);
        eh.set_kup_tet(kup_tet);

        let k0 = kup_tet[3];
        let cos_theta = fourvec::dot3(&kup_tet, &kup_tet_old) / (k0 * k0);
        debug_assert!(cos_theta.abs() <= 1.0 + 1e-9);

        if ctx.config.use_scattering_kernels && ctx.opac.has_kernels(eh.p.species) {
            if let (Some(z), Some(g_in)) = (eh.z_ind, eh.nu_bin) {
                sample_scattering_final_state(ctx, eh, z, g_in, cos_theta, rng);
                // momentum exchanged with the fluid by the inelastic event
                for i in 0..4 {
                    sc.tally.fourforce_abs[z][i] +=
                        (kup_tet_old[i] * n_old - eh.kup_tet[i] * eh.p.n) * HBAR_C;
                }
            }
        }
    }
}

/// Sample the outgoing frequency from the tabulated kernel.
///
/// The outgoing bin comes from rejection sampling with acceptance
/// φ₀·Δν/κₛ; the within-bin frequency is uniform, the packet is reweighted
/// by the interpolated φ₀ ratio, and the anisotropy moment δ biases the
/// weight by the scattering angle.
fn sample_scattering_final_state<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    z: usize,
    g_in: usize,
    cos_theta: f64,
    rng: &mut ChaChaRng,
) {
    let axis = ctx.opac.nu_axis();
    let s = eh.p.species;
    // normalizing with the in-bin-center κₛ makes the acceptance a
    // probability exactly, since κₛ was built as Σ φ₀ Δν
    let kappa_norm = ctx.opac.scattering(s, z, axis.mid[g_in]);
    debug_assert!(kappa_norm > 0.0);

    let (g_out, phi0avg) = loop {
        let g: usize = rng.random_range(0..axis.len());
        let phi0avg = ctx.opac.phi0(s, z, g_in, g);
        let p_accept = phi0avg * axis.delta(g) / kappa_norm;
        debug_assert!(p_accept <= 1.0 + 1e-9);
        if rng.random::<f64>() <= p_accept {
            break (g, phi0avg);
        }
    };

    let nu_out = axis.bottom(g_out) + axis.delta(g_out) * rng.random::<f64>();
    eh.scale_frequency(nu_out / eh.nu());

    let phi0_interp = ctx.opac.phi0_at(s, z, g_in, nu_out);
    if phi0avg > 0.0 {
        eh.p.n *= phi0_interp / phi0avg;
    }

    let delta = ctx.opac.delta_at(s, z, g_in, nu_out);
    debug_assert!(delta.abs() < 3.0);
    if delta.abs() <= 1.0 {
        eh.p.n *= 1.0 + delta * cos_theta;
    } else {
        let b = 2.0 * delta.abs() / (3.0 - delta.abs());
        if delta > 1.0 {
            eh.p.n *= (1.0 + cos_theta).powf(b);
        } else {
            eh.p.n *= (1.0 - cos_theta).powf(b);
        }
    }

    eh.refresh_opacity(ctx.opac);
}

/// Advance a packet through a scattering-dominated sphere in one move.
///
/// The dwell time comes from the first-passage CDF; the packet is displaced
/// by exactly the sphere radius along a random tetrad direction, its tally
/// contribution split between the directed displacement and optional
/// isotropic components representing the in-sphere path, and its weight
/// attenuated by the absorption along the full path.
fn random_walk<G: Grid>(
    ctx: Context<G>,
    eh: &mut EinsteinHelper,
    r_com: f64,
    d_diff: f64,
    cdf: &crate::randomwalk::RandomWalkCdf,
    rng: &mut ChaChaRng,
    sc: &mut Scratch,
) {
    debug_assert!(eh.scatopac > 0.0);
    debug_assert!(eh.absopac >= 0.0);
    debug_assert!(eh.p.n > 0.0);

    // comoving path length c·t with t from the dwell-time distribution
    let path = (C_LIGHT * r_com * r_com / d_diff * cdf.invert(rng.random())).max(r_com);

    // displacement direction in the comoving tetrad frame
    let d_iso = isotropic_direction(rng);
    let displacement_tet = Vector4::new(
        r_com * d_iso[0],
        r_com * d_iso[1],
        r_com * d_iso[2],
        path,
    );
    let x_new = eh.p.x + eh.tetrad_to_coord(&displacement_tet);

    // outgoing direction: isotropic in the forward hemisphere around the
    // displacement
    let p_d = outward_hemisphere(&d_iso, rng);
    let k0 = eh.kup_tet[3];

    // directed tally component
    let n_iso = ctx.config.randomwalk_n_isotropic;
    let directed_n = if n_iso > 0 {
        eh.p.n * r_com / path
    } else {
        eh.p.n
    };
    deposit_walk(ctx, eh, &d_iso, directed_n, path, &mut sc.tally);

    // isotropic components standing in for the path curled up inside the
    // sphere
    if n_iso > 0 {
        let iso_n = eh.p.n * (path - r_com) / path / n_iso as f64;
        if iso_n > 0.0 {
            for _ in 0..n_iso {
                let dir = isotropic_direction(rng);
                deposit_walk(ctx, eh, &dir, iso_n, path, &mut sc.tally);
            }
        }
    }

    // move to the sphere edge and attenuate over the full path
    eh.p.x = x_new;
    eh.set_kup_tet(Vector4::new(k0 * p_d[0], k0 * p_d[1], k0 * p_d[2], k0));
    eh.p.n *= (-eh.absopac * path).exp();
    eh.update(ctx.grid, ctx.opac);
}

/// One random-walk tally deposit along a tetrad-frame direction, with the
/// analytic optical-depth weighting of the exponential mode.
fn deposit_walk<G: Grid>(
    ctx: Context<G>,
    eh: &EinsteinHelper,
    dir_tet: &nalgebra::Vector3<f64>,
    n_eff: f64,
    path: f64,
    tally: &mut Tally,
) {
    let Some(z) = eh.z_ind else {
        return;
    };
    debug_assert!(n_eff >= 0.0);

    let nu = eh.nu();
    let hnu = nu * H_PLANCK;
    let g_bin = ctx.opac.nu_axis().bin_clamped(nu);
    let s = eh.p.species;
    let k0 = eh.kup_tet[3];
    let k_tet = Vector4::new(k0 * dir_tet[0], k0 * dir_tet[1], k0 * dir_tet[2], k0);

    let l_eff = if eh.absopac > 0.0 {
        (1.0 - (-eh.absopac * path).exp()) / eh.absopac
    } else {
        path
    };
    tally.distribution[s].count(&k_tet, &eh.p.x, z, g_bin, n_eff * hnu * l_eff);

    let absorbed = n_eff * (1.0 - (-eh.absopac * path).exp());
    for i in 0..4 {
        tally.fourforce_abs[z][i] += k_tet[i] * HBAR_C * absorbed;
    }
    let lepton = ctx.species[s].lepton_number;
    if lepton != 0 {
        tally.l_abs[z] += absorbed * lepton as f64;
    }
}
