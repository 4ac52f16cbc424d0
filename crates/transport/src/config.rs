//! Frozen run configuration.
//!
//! A `TransportConfig` is deserialized once at startup, validated, and never
//! mutated afterwards. Everything the packet loop consults at runtime lives
//! here; per-species quantities live on the [`crate::species::Species`]
//! records instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use units::Length;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("step_size must be positive, got {0}")]
    BadStepSize(f64),

    #[error("min_packet_number ({min}) must not exceed max_packet_number ({max})")]
    BadPacketWindow { min: f64, max: f64 },

    #[error("max_particles must be positive")]
    NoParticleBudget,

    #[error("r_core must be non-negative, got {0} cm")]
    BadCoreRadius(f64),

    #[error("random walk enabled but {name} = {value} is not usable")]
    BadRandomWalk { name: &'static str, value: f64 },

    #[error("grid has no GR metric but do_gr is set")]
    GrMismatch,

    #[error("opacity table covers {table} zones but the grid has {grid}")]
    ZoneMismatch { table: usize, grid: usize },

    #[error("opacity table covers {table} species but {given} were supplied")]
    SpeciesMismatch { table: usize, given: usize },

    #[error("scattering kernels requested but the table has none")]
    MissingKernels,
}

/// Run parameters, frozen at initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Fractional zone length used as the minimum propagation step
    pub step_size: f64,

    /// Roulette threshold: packets at or below this number are windowed
    pub min_packet_number: f64,

    /// Split threshold: packets above this number are divided
    pub max_packet_number: f64,

    /// Hard cap on the per-rank packet pool
    pub max_particles: usize,

    /// Radius of the central emitting surface; zero disables the core
    pub r_core: Length,

    /// Packets emitted per (species, frequency bin) from the core surface
    pub n_emit_core_per_bin: usize,

    /// Packets emitted per (zone, species, frequency bin) from the fluid
    pub n_emit_zones_per_bin: usize,

    /// Overall scaling of the core luminosity
    pub core_lum_multiplier: f64,

    /// Deposit absorption continuously along the path instead of at
    /// interaction events
    pub exponential_decay: bool,

    /// Random-walk sphere size in units of the zone minimum length;
    /// zero disables the diffusion approximation
    pub randomwalk_sphere_size: f64,

    /// Scattering optical depth a sphere must reach before the random walk
    /// takes over
    pub randomwalk_min_optical_depth: f64,

    /// Upper end of the tabulated first-passage CDF abscissa x = Dt/R²
    pub randomwalk_max_x: f64,

    /// Number of series terms in the first-passage CDF
    pub randomwalk_sum_n: usize,

    /// Number of tabulated CDF points
    pub randomwalk_npoints: usize,

    /// Isotropic tally components per random walk (0 = directed only)
    pub randomwalk_n_isotropic: usize,

    /// Sample outgoing frequencies from the tabulated scattering kernels
    pub use_scattering_kernels: bool,

    /// Integrate geodesics on a curved metric
    pub do_gr: bool,

    /// Reflect packets at the outer boundary instead of escaping them
    pub reflect_outer: bool,

    /// Base seed of every RNG stream in the run
    pub seed: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            step_size: 0.4,
            min_packet_number: 0.0,
            max_packet_number: f64::INFINITY,
            max_particles: 1_000_000,
            r_core: Length::zero(),
            n_emit_core_per_bin: 0,
            n_emit_zones_per_bin: 0,
            core_lum_multiplier: 1.0,
            exponential_decay: false,
            randomwalk_sphere_size: 0.0,
            randomwalk_min_optical_depth: 12.0,
            randomwalk_max_x: 2.0,
            randomwalk_sum_n: 1000,
            randomwalk_npoints: 200,
            randomwalk_n_isotropic: 0,
            use_scattering_kernels: false,
            do_gr: false,
            reflect_outer: false,
            seed: 42,
        }
    }
}

impl TransportConfig {
    /// Check internal consistency. Fatal at init; nothing here is recoverable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step_size > 0.0) {
            return Err(ConfigError::BadStepSize(self.step_size));
        }
        if self.min_packet_number > self.max_packet_number {
            return Err(ConfigError::BadPacketWindow {
                min: self.min_packet_number,
                max: self.max_packet_number,
            });
        }
        if self.max_particles == 0 {
            return Err(ConfigError::NoParticleBudget);
        }
        if self.r_core.to_cm() < 0.0 {
            return Err(ConfigError::BadCoreRadius(self.r_core.to_cm()));
        }
        if self.randomwalk_sphere_size > 0.0 {
            for (name, value) in [
                (
                    "randomwalk_min_optical_depth",
                    self.randomwalk_min_optical_depth,
                ),
                ("randomwalk_max_x", self.randomwalk_max_x),
                ("randomwalk_sum_n", self.randomwalk_sum_n as f64),
                ("randomwalk_npoints", self.randomwalk_npoints as f64),
            ] {
                if !(value > 0.0) {
                    return Err(ConfigError::BadRandomWalk { name, value });
                }
            }
        }
        Ok(())
    }
}
