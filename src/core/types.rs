use serde::{Deserialize, Serialize};

use crate::core::position::Position;

/// Reference-object index inside its collection
pub type RefIndex = usize;

/// Candidate (reconstructed tau) index inside its collection
pub type CandIndex = usize;

/// PDG identifier of the electron
pub const PDG_ELECTRON: i64 = 11;
/// PDG identifier of the muon
pub const PDG_MUON: i64 = 13;
/// PDG identifier of the tau lepton
pub const PDG_TAU: i64 = 15;

/// An object taking part in matching: its index in the event collection plus
/// its direction. Used both for reference objects and for candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchObject {
    pub index: usize,
    pub position: Position,
}

impl MatchObject {
    #[must_use]
    pub fn new(index: usize, eta: f64, phi: f64) -> Self {
        Self {
            index,
            position: Position::new(eta, phi),
        }
    }
}

/// Which object plays the fake reference in a fake-rate measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FakeScenario {
    /// Reconstructed jets
    RecoJets,
    /// Generator-level jets
    GenJets,
    /// Generator-level electrons
    FakeElectrons,
    /// Generator-level muons
    FakeMuons,
}

impl FakeScenario {
    /// PDG id the generator particle must carry, if the scenario restricts it
    #[must_use]
    pub fn required_pdg_id(self) -> Option<i64> {
        match self {
            Self::FakeElectrons => Some(PDG_ELECTRON),
            Self::FakeMuons => Some(PDG_MUON),
            Self::RecoJets | Self::GenJets => None,
        }
    }

    /// Whether the reference objects are jets (subject to the lepton pollution veto)
    #[must_use]
    pub fn is_jet(self) -> bool {
        matches!(self, Self::RecoJets | Self::GenJets)
    }
}

impl std::fmt::Display for FakeScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecoJets => write!(f, "reco jets"),
            Self::GenJets => write!(f, "gen jets"),
            Self::FakeElectrons => write!(f, "fake electrons"),
            Self::FakeMuons => write!(f, "fake muons"),
        }
    }
}

/// Analysis being produced: genuine-tau efficiency or fake rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Efficiency,
    FakeRate { scenario: FakeScenario },
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Efficiency => write!(f, "efficiency"),
            Self::FakeRate { scenario } => write!(f, "fake rate ({scenario})"),
        }
    }
}
