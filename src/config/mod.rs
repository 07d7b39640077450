//! Analysis configuration.
//!
//! A config names the collections of the input events, picks the analysis
//! mode (efficiency or one of the fake-rate scenarios), and sets the matching
//! radius, the reference selection, and the variables written to the ntuple.
//!
//! The default config is embedded from `configs/default_analysis.json`; custom
//! configs are loaded with [`AnalysisConfig::load_from_file`]. Unset sections
//! fall back to their defaults.
//!
//! ## Example
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "mode": { "kind": "fake_rate", "scenario": "reco_jets" },
//!   "comparison_tau": "Tau",
//!   "matching": { "dr_max": 0.4 },
//!   "quality_cuts": { "jet": { "pt_min": 30.0, "abs_eta_max": 2.3 } },
//!   "extra_cut": "|eta| < 2.1",
//!   "veto_lepton_pollution": true
//! }
//! ```

pub mod analysis;

pub use analysis::{AnalysisConfig, CollectionNames, ConfigError, OppositeLink, VariableLists};
