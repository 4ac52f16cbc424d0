//! The transport driver: owns the grid, species, opacities, packet pool,
//! and tallies, and runs the per-step cycle
//! reset → emit → propagate → reduce → normalize.

use std::sync::atomic::AtomicUsize;

use spacetime::Grid;
use units::constants::H_PLANCK;
use units::Time;

use crate::comm::{Communicator, NullComm};
use crate::config::{ConfigError, TransportConfig};
use crate::emission::{self, EmissionStats};
use crate::helper::EinsteinHelper;
use crate::opacity::OpacityTable;
use crate::packet::{Fate, Packet};
use crate::propagate::{audit_pool, propagate_all, Context};
use crate::randomwalk::RandomWalkCdf;
use crate::species::Species;
use crate::tally::Tally;
use crate::Error;

pub struct Transport<G> {
    pub grid: G,
    pub species: Vec<Species>,
    pub opacities: OpacityTable,
    pub config: TransportConfig,
    pub comm: Box<dyn Communicator>,

    /// The per-rank packet pool. Cleared at the end of every step.
    pub particles: Vec<Packet>,
    /// This step's accumulators.
    pub tally: Tally,

    randomwalk: Option<RandomWalkCdf>,
    step_index: u64,
}

impl<G: Grid> Transport<G> {
    /// Wire up a transport run. Configuration and cross-consistency errors
    /// are fatal here, before any packet exists.
    pub fn new(
        grid: G,
        species: Vec<Species>,
        opacities: OpacityTable,
        config: TransportConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.do_gr && !grid.do_gr() {
            return Err(ConfigError::GrMismatch);
        }
        if opacities.n_zones() != grid.n_zones() {
            return Err(ConfigError::ZoneMismatch {
                table: opacities.n_zones(),
                grid: grid.n_zones(),
            });
        }
        if opacities.n_species() != species.len() {
            return Err(ConfigError::SpeciesMismatch {
                table: opacities.n_species(),
                given: species.len(),
            });
        }
        if config.use_scattering_kernels
            && !(0..species.len()).any(|s| opacities.has_kernels(s))
        {
            return Err(ConfigError::MissingKernels);
        }

        // 1D grids tally radial moments, everything else the full tensor
        let radial = grid.spatial_axes().len() == 1;
        let tally = Tally::new(
            species.len(),
            grid.n_zones(),
            opacities.nu_axis(),
            radial,
            10,
            1,
        );
        let randomwalk = (config.randomwalk_sphere_size > 0.0).then(|| {
            RandomWalkCdf::new(
                config.randomwalk_max_x,
                config.randomwalk_npoints,
                config.randomwalk_sum_n,
            )
        });

        Ok(Self {
            grid,
            species,
            opacities,
            config,
            comm: Box::new(NullComm),
            particles: Vec::new(),
            tally,
            randomwalk,
            step_index: 0,
        })
    }

    /// Replace the single-rank communicator.
    pub fn with_communicator(mut self, comm: Box<dyn Communicator>) -> Self {
        self.comm = comm;
        self
    }

    pub fn total_particles(&self) -> usize {
        self.particles.len()
    }

    /// Emit this step's packets from the core and the zones.
    pub fn emit(&mut self) -> Result<EmissionStats, Error> {
        let ctx = Context {
            grid: &self.grid,
            species: &self.species,
            opac: &self.opacities,
            config: &self.config,
            randomwalk: self.randomwalk.as_ref(),
        };
        let pool_count = AtomicUsize::new(self.particles.len());
        emission::emit_packets(
            ctx,
            self.comm.rank(),
            self.comm.n_ranks(),
            self.step_index,
            &mut self.particles,
            &mut self.tally,
            &pool_count,
        )
    }

    /// Propagate every live packet until its fate is terminal or its time
    /// slot reaches `ct_max` (cm). Pass infinity to run to completion.
    pub fn propagate_for(&mut self, ct_max: f64) {
        let ctx = Context {
            grid: &self.grid,
            species: &self.species,
            opac: &self.opacities,
            config: &self.config,
            randomwalk: self.randomwalk.as_ref(),
        };
        let pool_count = AtomicUsize::new(self.particles.len());
        propagate_all(ctx, &mut self.particles, &mut self.tally, &pool_count, ct_max);
    }

    /// All-rank combine of this step's tallies.
    pub fn reduce(&mut self) {
        self.tally.reduce(self.comm.as_ref());
    }

    /// Convert the combined tallies into physical intensities.
    pub fn normalize(&mut self, dt: Time) {
        self.tally
            .normalize(&self.grid, self.opacities.nu_axis(), dt.to_seconds());
    }

    /// One full transport step over `dt`.
    pub fn step(&mut self, dt: Time) -> Result<(), Error> {
        self.tally.wipe();

        let stats = self.emit()?;
        self.propagate_for(f64::INFINITY);
        audit_pool(&self.particles, &mut self.tally);

        self.reduce();
        self.normalize(dt);

        tracing::info!(
            step = self.step_index,
            emitted = stats.created,
            escaped = self.tally.n_escape.iter().sum::<u64>(),
            total_energy = self.tally.total_energy,
            escape_energy = self.tally.escape_energy,
            core_abs_energy = self.tally.core_abs_energy,
            rouletted_energy = self.tally.rouletted_energy,
            "transport step complete"
        );

        self.particles.clear();
        self.step_index += 1;
        Ok(())
    }

    /// Deposit the instantaneous state of every live packet into the
    /// distribution arrays. Used by drivers that inspect the radiation field
    /// mid-flight instead of integrating over paths.
    pub fn record_current_distribution(&mut self) {
        for p in &self.particles {
            if p.fate != Fate::Moving {
                continue;
            }
            let eh = EinsteinHelper::new(*p, &self.grid, &self.opacities);
            let Some(z) = eh.z_ind else {
                continue;
            };
            let nu = eh.nu();
            let g = self.opacities.nu_axis().bin_clamped(nu);
            self.tally.distribution[p.species].count(
                &eh.kup_tet,
                &p.x,
                z,
                g,
                p.n * nu * H_PLANCK,
            );
        }
    }
}
