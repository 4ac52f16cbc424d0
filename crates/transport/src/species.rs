//! Neutrino species descriptors.

use serde::{Deserialize, Serialize};
use units::{Energy, Temperature};

/// One transported species: its lepton number and the thermodynamic state of
/// the central emitting surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    pub name: String,

    /// +1 for νe, −1 for ν̄e, 0 for the heavy-lepton species
    pub lepton_number: i32,

    /// Temperature of the core surface seen by this species
    pub t_core: Temperature,

    /// Chemical potential of the core surface seen by this species
    pub mu_core: Energy,

    /// Statistical weight: how many physical species this record stands for
    /// (4 for the combined νμ/ν̄μ/ντ/ν̄τ species)
    pub weight: f64,
}

impl Species {
    pub fn electron_neutrino(t_core: Temperature, mu_core: Energy) -> Self {
        Self {
            name: "nue".to_string(),
            lepton_number: 1,
            t_core,
            mu_core,
            weight: 1.0,
        }
    }

    pub fn electron_antineutrino(t_core: Temperature, mu_core: Energy) -> Self {
        Self {
            name: "nuebar".to_string(),
            lepton_number: -1,
            t_core,
            mu_core,
            weight: 1.0,
        }
    }

    /// The four heavy-lepton species folded into one record.
    pub fn heavy_lepton(t_core: Temperature) -> Self {
        Self {
            name: "nux".to_string(),
            lepton_number: 0,
            t_core,
            mu_core: Energy::zero(),
            weight: 4.0,
        }
    }
}
