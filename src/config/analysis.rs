use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::core::types::{AnalysisMode, FakeScenario};
use crate::matching::engine::MatchingConfig;
use crate::selection::{
    CutError, CutExpression, GenJetLink, LeptonPollutionVeto, ObjectSelector, QualityCuts,
    ReferenceCuts,
};
use crate::utils::validation::{is_valid_radius, MAX_MATCHING_RADIUS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid extra cut: {0}")]
    CutError(#[from] CutError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Config version for compatibility checking
pub const CONFIG_VERSION: &str = "1.0.0";

/// Variables stored when a collection has no explicit list
pub const DEFAULT_OBJECT_VARIABLES: [&str; 3] = ["pt", "eta", "phi"];

/// Reco jet variable holding the index of its generator jet
pub const GEN_JET_INDEX_VARIABLE: &str = "genJetIdx";

/// Tau variable holding the index of its seed jet (negative when none)
pub const SEED_JET_INDEX_VARIABLE: &str = "jetIdx";

/// Cone for the generator tau filled next to a matched tau in fake-rate rows
pub const GEN_TAU_MATCH_RADIUS: f64 = 0.3;

/// Generator taus closer than this to another generator tau are dropped when
/// `isolate_gen_taus` is set
pub const GEN_TAU_ISOLATION_RADIUS: f64 = 0.5;

/// How a row finds its opposite object once the reference has a tau
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OppositeLink {
    /// Jet whose index the tau stores in `{tau}_{index_variable}`
    SeedJet { index_variable: &'static str },
    /// Nearest object of the opposite collection within `max_radius` of the tau
    Nearest { max_radius: f64 },
}

/// Branch prefixes of the collections used by the analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionNames {
    /// Generator-level visible taus
    pub gen_tau: String,
    /// Reconstructed jets
    pub reco_jet: String,
    /// Generator-level jets
    pub gen_jet: String,
    /// Generator-level particles (electrons, muons)
    pub gen_particle: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            gen_tau: "GenVisTau".to_string(),
            reco_jet: "Jet".to_string(),
            gen_jet: "GenJet".to_string(),
            gen_particle: "GenPart".to_string(),
        }
    }
}

/// Which branches end up in the output ntuple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableLists {
    /// Event-level scalar branches copied to every row
    #[serde(default)]
    pub info: Vec<String>,

    /// Per-collection variables, keyed by collection prefix
    #[serde(default)]
    pub objects: BTreeMap<String, Vec<String>>,
}

impl VariableLists {
    /// Variables to store for `collection`, falling back to pt, eta and phi
    #[must_use]
    pub fn for_collection(&self, collection: &str) -> Vec<String> {
        self.objects.get(collection).cloned().unwrap_or_else(|| {
            DEFAULT_OBJECT_VARIABLES
                .iter()
                .map(ToString::to_string)
                .collect()
        })
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub version: String,

    #[serde(default)]
    pub mode: AnalysisMode,

    /// Collection of the reconstructed taus being evaluated
    pub comparison_tau: String,

    #[serde(default)]
    pub collections: CollectionNames,

    #[serde(default)]
    pub matching: MatchingConfig,

    /// Acceptance per kind of reference object
    #[serde(default)]
    pub quality_cuts: ReferenceCuts,

    /// Additional selection on reference objects, e.g. `pt>30 && |eta|<2.1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_cut: Option<String>,

    /// Drop jet references whose generator jet overlaps a prompt generator lepton
    #[serde(default = "default_veto_lepton_pollution")]
    pub veto_lepton_pollution: bool,

    /// Drop generator taus with another generator tau nearby (multi-tau gun samples)
    #[serde(default)]
    pub isolate_gen_taus: bool,

    #[serde(default)]
    pub variables: VariableLists,
}

fn default_veto_lepton_pollution() -> bool {
    true
}

impl AnalysisConfig {
    /// Load the embedded default config
    pub fn load_embedded() -> Result<Self, ConfigError> {
        // Validated at compile time by build.rs
        const EMBEDDED_CONFIG: &str = include_str!("../../configs/default_analysis.json");
        Self::from_json(EMBEDDED_CONFIG)
    }

    /// Load a config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values serde cannot check
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an incompatible version, an invalid
    /// radius or quality cut, or an empty collection name, and
    /// `ConfigError::CutError` if the extra cut does not parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let major = |v: &str| v.split('.').next().map(str::to_string);
        if major(&self.version) != major(CONFIG_VERSION) {
            return Err(ConfigError::Invalid(format!(
                "version {} is not compatible with {CONFIG_VERSION}",
                self.version
            )));
        }

        if !is_valid_radius(self.matching.max_radius) {
            return Err(ConfigError::Invalid(format!(
                "dr_max must be within [0, {MAX_MATCHING_RADIUS}], got {}",
                self.matching.max_radius
            )));
        }

        let cuts = [
            ("gen_tau", self.quality_cuts.gen_tau),
            ("jet", self.quality_cuts.jet),
            ("lepton", self.quality_cuts.lepton),
        ];
        for (kind, cut) in cuts {
            if !cut.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "quality_cuts.{kind} must be finite with abs_eta_max >= 0, got pt_min={} abs_eta_max={}",
                    cut.pt_min, cut.abs_eta_max
                )));
            }
        }

        let names = [
            ("comparison_tau", &self.comparison_tau),
            ("collections.gen_tau", &self.collections.gen_tau),
            ("collections.reco_jet", &self.collections.reco_jet),
            ("collections.gen_jet", &self.collections.gen_jet),
            ("collections.gen_particle", &self.collections.gen_particle),
        ];
        for (field, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }

        self.extra_cut_expression()?;
        Ok(())
    }

    /// Parsed extra cut, if any
    pub fn extra_cut_expression(&self) -> Result<Option<CutExpression>, CutError> {
        self.extra_cut
            .as_deref()
            .map(CutExpression::parse)
            .transpose()
    }

    /// Collection playing the reference role for the configured mode
    #[must_use]
    pub fn reference_collection(&self) -> &str {
        match self.mode {
            AnalysisMode::Efficiency => &self.collections.gen_tau,
            AnalysisMode::FakeRate { scenario } => match scenario {
                FakeScenario::RecoJets => &self.collections.reco_jet,
                FakeScenario::GenJets => &self.collections.gen_jet,
                FakeScenario::FakeElectrons | FakeScenario::FakeMuons => {
                    &self.collections.gen_particle
                }
            },
        }
    }

    /// Collection of the object filled next to a matched tau: its seed jet for
    /// efficiency, the nearest generator tau for fake rates
    #[must_use]
    pub fn opposite_collection(&self) -> &str {
        match self.mode {
            AnalysisMode::Efficiency => &self.collections.reco_jet,
            AnalysisMode::FakeRate { .. } => &self.collections.gen_tau,
        }
    }

    #[must_use]
    pub fn opposite_link(&self) -> OppositeLink {
        match self.mode {
            AnalysisMode::Efficiency => OppositeLink::SeedJet {
                index_variable: SEED_JET_INDEX_VARIABLE,
            },
            AnalysisMode::FakeRate { .. } => OppositeLink::Nearest {
                max_radius: GEN_TAU_MATCH_RADIUS,
            },
        }
    }

    /// Quality cuts for the reference objects of the configured mode
    #[must_use]
    pub fn reference_cuts(&self) -> QualityCuts {
        match self.mode {
            AnalysisMode::Efficiency => self.quality_cuts.gen_tau,
            AnalysisMode::FakeRate { scenario } if scenario.is_jet() => self.quality_cuts.jet,
            AnalysisMode::FakeRate { .. } => self.quality_cuts.lepton,
        }
    }

    /// PDG id the reference objects must carry
    #[must_use]
    pub fn reference_pdg_id(&self) -> Option<i64> {
        match self.mode {
            AnalysisMode::Efficiency => None,
            AnalysisMode::FakeRate { scenario } => scenario.required_pdg_id(),
        }
    }

    /// Generator electron and muon references must be prompt
    #[must_use]
    pub fn requires_prompt_reference(&self) -> bool {
        self.reference_pdg_id().is_some()
    }

    /// Reco jet references must point at a generator jet
    #[must_use]
    pub fn gen_jet_link(&self) -> Option<GenJetLink<'_>> {
        match self.mode {
            AnalysisMode::FakeRate {
                scenario: FakeScenario::RecoJets,
            } => Some(GenJetLink {
                index_variable: GEN_JET_INDEX_VARIABLE,
                gen_jet: &self.collections.gen_jet,
            }),
            _ => None,
        }
    }

    /// Isolation radius for generator tau references, when enabled
    #[must_use]
    pub fn reference_isolation(&self) -> Option<f64> {
        match self.mode {
            AnalysisMode::Efficiency if self.isolate_gen_taus => Some(GEN_TAU_ISOLATION_RADIUS),
            _ => None,
        }
    }

    /// Pollution veto for jet references, when enabled
    #[must_use]
    pub fn pollution_veto(&self) -> Option<LeptonPollutionVeto> {
        match self.mode {
            AnalysisMode::FakeRate { scenario }
                if scenario.is_jet() && self.veto_lepton_pollution =>
            {
                Some(LeptonPollutionVeto::new(&self.collections.gen_particle))
            }
            _ => None,
        }
    }

    /// Selector for the reference objects of the configured mode
    #[must_use]
    pub fn reference_selector<'a>(
        &'a self,
        extra: Option<&'a CutExpression>,
        veto: Option<&'a LeptonPollutionVeto>,
    ) -> ObjectSelector<'a> {
        ObjectSelector::new(self.reference_collection(), self.reference_cuts())
            .with_extra_cuts(extra)
            .with_pollution_veto(veto)
            .with_gen_jet_link(self.gen_jet_link())
            .with_pdg_id(self.reference_pdg_id())
            .with_prompt_requirement(self.requires_prompt_reference())
            .with_isolation(self.reference_isolation())
    }
}
