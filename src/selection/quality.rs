use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::event::{Event, EventError};
use crate::core::position::Position;
use crate::core::types::{MatchObject, PDG_ELECTRON, PDG_MUON, PDG_TAU};
use crate::utils::validation::as_integer;

/// Lowest pt for generator-level visible taus
pub const GEN_TAU_MIN_PT: f64 = 10.0;

/// Tracker acceptance
pub const TRACKER_ABS_ETA_MAX: f64 = 2.3;

/// Kinematic acceptance applied to reference objects before matching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityCuts {
    /// Minimum transverse momentum in GeV
    pub pt_min: f64,

    /// Maximum absolute pseudorapidity
    pub abs_eta_max: f64,
}

impl Default for QualityCuts {
    fn default() -> Self {
        Self::new(20.0, TRACKER_ABS_ETA_MAX)
    }
}

impl QualityCuts {
    #[must_use]
    pub const fn new(pt_min: f64, abs_eta_max: f64) -> Self {
        Self {
            pt_min,
            abs_eta_max,
        }
    }

    #[must_use]
    pub fn passes(&self, pt: f64, eta: f64) -> bool {
        pt >= self.pt_min && eta.abs() <= self.abs_eta_max
    }

    /// Whether both bounds are finite and the eta bound is not negative
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pt_min.is_finite() && self.abs_eta_max.is_finite() && self.abs_eta_max >= 0.0
    }
}

/// Quality cuts for each kind of reference object.
///
/// Generator taus are kept down to 10 GeV; jets and generator leptons start
/// at 20 GeV.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCuts {
    #[serde(default = "ReferenceCuts::default_gen_tau")]
    pub gen_tau: QualityCuts,

    #[serde(default)]
    pub jet: QualityCuts,

    #[serde(default)]
    pub lepton: QualityCuts,
}

impl ReferenceCuts {
    fn default_gen_tau() -> QualityCuts {
        QualityCuts::new(GEN_TAU_MIN_PT, TRACKER_ABS_ETA_MAX)
    }
}

impl Default for ReferenceCuts {
    fn default() -> Self {
        Self {
            gen_tau: Self::default_gen_tau(),
            jet: QualityCuts::default(),
            lepton: QualityCuts::default(),
        }
    }
}

/// `statusFlags` bit: isPrompt
const FLAG_IS_PROMPT: u32 = 0;
/// `statusFlags` bit: isDecayedLeptonHadron
const FLAG_IS_DECAYED: u32 = 1;
/// `statusFlags` bit: isDirectPromptTauDecayProduct
const FLAG_IS_DIRECT_PROMPT_TAU_DECAY_PRODUCT: u32 = 5;

fn has_flag(flags: i64, bit: u32) -> bool {
    (flags >> bit) & 1 == 1
}

/// Whether a generator electron or muon is prompt: flagged isPrompt, or a
/// final-state direct decay product of a prompt tau
#[must_use]
pub fn is_prompt_lepton(status: i64, flags: i64) -> bool {
    has_flag(flags, FLAG_IS_PROMPT)
        || (status == 1 && has_flag(flags, FLAG_IS_DIRECT_PROMPT_TAU_DECAY_PRODUCT))
}

/// Rejects jet-like reference objects that overlap a prompt generator lepton.
///
/// A generator particle pollutes a jet when it is an electron, muon or tau with
/// status 1 and `pt >= min_pt`, flagged prompt (taus also decayed), and lies
/// within `dR < max_dr` of the generator jet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeptonPollutionVeto {
    /// Generator particle collection
    pub gen_particle: String,
    pub min_pt: f64,
    pub max_dr: f64,
}

impl LeptonPollutionVeto {
    #[must_use]
    pub fn new(gen_particle: impl Into<String>) -> Self {
        Self {
            gen_particle: gen_particle.into(),
            min_pt: 15.0,
            max_dr: 0.5,
        }
    }

    /// Generator leptons of the event that can pollute a jet
    ///
    /// # Errors
    ///
    /// Returns `EventError` if the generator particle branches are missing or inconsistent.
    pub fn prompt_leptons(&self, event: &Event) -> Result<Vec<MatchObject>, EventError> {
        let particles = event.collection(&self.gen_particle)?;
        let n = particles.len();
        let pdg_ids = event.checked_array(&self.gen_particle, "pdgId", n)?;
        let pts = event.checked_array(&self.gen_particle, "pt", n)?;
        let statuses = event.checked_array(&self.gen_particle, "status", n)?;
        let status_flags = event.checked_array(&self.gen_particle, "statusFlags", n)?;

        let mut leptons = Vec::new();
        for particle in particles {
            let i = particle.index;
            let (Some(pdg_id), Some(status), Some(flags)) =
                (as_integer(pdg_ids[i]), as_integer(statuses[i]), as_integer(status_flags[i]))
            else {
                warn!(
                    collection = %self.gen_particle,
                    index = i,
                    "Skipping generator particle with non-integer identifiers"
                );
                continue;
            };

            let pdg_id = pdg_id.abs();
            if !matches!(pdg_id, PDG_ELECTRON | PDG_MUON | PDG_TAU) {
                continue;
            }
            if pts[i] < self.min_pt || status != 1 {
                continue;
            }
            let prompt = has_flag(flags, FLAG_IS_PROMPT);
            let selected = if pdg_id == PDG_TAU {
                prompt && has_flag(flags, FLAG_IS_DECAYED)
            } else {
                prompt
            };
            if selected {
                leptons.push(particle);
            }
        }

        Ok(leptons)
    }

    /// Whether any of `leptons` lies within `max_dr` of `jet`
    #[must_use]
    pub fn pollutes(&self, leptons: &[MatchObject], jet: &Position) -> bool {
        leptons
            .iter()
            .any(|lepton| lepton.position.delta_r(jet) < self.max_dr)
    }

    /// Whether a prompt lepton lies close to the generator jet at `jet`
    ///
    /// # Errors
    ///
    /// See [`LeptonPollutionVeto::prompt_leptons`].
    pub fn is_polluted(&self, event: &Event, jet: &Position) -> Result<bool, EventError> {
        Ok(self.pollutes(&self.prompt_leptons(event)?, jet))
    }
}
