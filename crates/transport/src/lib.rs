//! Monte Carlo neutrino transport through relativistic fluid backgrounds.
//!
//! Sample packets, each standing in for many physical neutrinos, are emitted
//! from a hot central surface and from the thermal fluid, propagated along
//! (optionally general-relativistic) null geodesics through the zones of a
//! [`spacetime::Grid`], scattered and absorbed against tabulated opacities,
//! and tallied into per-zone radiation moments, four-force deposition, and
//! escape spectra.
//!
//! The cycle of one transport step:
//!
//! 1. reset the per-step accumulators;
//! 2. emit packets (core surface + thermal zones);
//! 3. propagate every packet to a terminal fate (escape, core absorption,
//!    or roulette), with population control keeping weights in a window;
//! 4. combine tallies across ranks;
//! 5. normalize moments into physical intensities.
//!
//! Entry point: [`Transport`].

pub mod blackbody;
pub mod comm;
pub mod config;
pub mod helper;
pub mod opacity;
pub mod output;
pub mod packet;
pub mod randomwalk;
pub mod rng;
pub mod species;
pub mod tally;

mod emission;
mod propagate;
mod scatter;
mod sim;

use thiserror::Error as ThisError;

pub use comm::{Communicator, NullComm};
pub use config::{ConfigError, TransportConfig};
pub use emission::EmissionStats;
pub use helper::EinsteinHelper;
pub use opacity::OpacityTable;
pub use output::{DatasetSink, MemorySink};
pub use packet::{Fate, Packet};
pub use randomwalk::RandomWalkCdf;
pub use sim::Transport;
pub use species::Species;
pub use tally::{AngularSpectrum, Distribution, Tally};

/// Runtime failures of the transport engine. Everything here is fatal for
/// the step that raised it.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "emitting {requested} packets would overflow the pool \
         ({current} active, max {max})"
    )]
    TooManyPackets {
        current: usize,
        requested: usize,
        max: usize,
    },
}
