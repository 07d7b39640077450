//! Command-line interface for tau-matcher.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **ntuple**: Match events and write a flat ntuple, one row per reference object
//! - **match**: Report per-event assignments and shared-candidate conflicts
//! - **config**: Show the effective analysis config or validate a config file
//!
//! ## Usage
//!
//! ```text
//! # Efficiency ntuple from generator taus
//! tau-matcher ntuple ztt.jsonl.gz --output ztt.tsv
//!
//! # Fake-rate ntuple against reconstructed jets with a wider cone
//! tau-matcher ntuple ttbar.jsonl --scenario reco-jets --dr-max 0.4 --output ttbar.tsv
//!
//! # Stream events from another tool
//! nano-to-json sample.root | tau-matcher match - --format json
//!
//! # Inspect the embedded config
//! tau-matcher config show
//! ```

use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};

use crate::config::AnalysisConfig;
use crate::core::types::{AnalysisMode, FakeScenario};

pub mod config;
pub mod match_events;
pub mod ntuple;

#[derive(Parser)]
#[command(name = "tau-matcher")]
#[command(version)]
#[command(about = "Match reconstructed taus to reference objects and build flat ntuples")]
#[command(
    long_about = "tau-matcher assigns reconstructed taus to reference objects (generator taus, jets, or generator leptons) by angular distance.\n\nA tau claimed by several reference objects is handed to the closest one, and events where this happens are counted as double counts. The result is written as a flat ntuple for efficiency and fake-rate studies."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a flat ntuple from an event file
    Ntuple(ntuple::NtupleArgs),

    /// Show per-event matching results
    Match(match_events::MatchArgs),

    /// Show or validate analysis configs
    Config(config::ConfigArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    /// Generator taus as references
    Efficiency,
    /// Jets or generator leptons as references
    FakeRate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioArg {
    RecoJets,
    GenJets,
    FakeElectrons,
    FakeMuons,
}

impl From<ScenarioArg> for FakeScenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::RecoJets => Self::RecoJets,
            ScenarioArg::GenJets => Self::GenJets,
            ScenarioArg::FakeElectrons => Self::FakeElectrons,
            ScenarioArg::FakeMuons => Self::FakeMuons,
        }
    }
}

/// Options shared by the commands that run the analysis
#[derive(Args, Debug, Clone)]
pub struct AnalysisArgs {
    /// Path to a custom analysis config (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum dR for a match (overrides the config)
    #[arg(long)]
    pub dr_max: Option<f64>,

    /// Analysis mode (overrides the config)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Fake-rate reference objects; implies --mode fake-rate
    #[arg(long, value_enum)]
    pub scenario: Option<ScenarioArg>,

    /// Drop generator taus with another generator tau within dR 0.5 (multi-tau gun samples)
    #[arg(long)]
    pub isolate_gen_taus: bool,
}

impl AnalysisArgs {
    /// Load the config file (or the embedded default) and apply flag overrides
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded, the flags contradict
    /// each other, or the result fails validation.
    pub fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load_from_file(path)?,
            None => AnalysisConfig::load_embedded()?,
        };
        self.apply_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AnalysisConfig) -> anyhow::Result<()> {
        if let Some(dr_max) = self.dr_max {
            config.matching.max_radius = dr_max;
        }
        if self.isolate_gen_taus {
            config.isolate_gen_taus = true;
        }

        config.mode = match (self.mode, self.scenario) {
            (Some(ModeArg::Efficiency), Some(_)) => {
                bail!("--scenario cannot be combined with --mode efficiency")
            }
            (Some(ModeArg::Efficiency), None) => AnalysisMode::Efficiency,
            (_, Some(scenario)) => AnalysisMode::FakeRate {
                scenario: scenario.into(),
            },
            (Some(ModeArg::FakeRate), None) => match config.mode {
                AnalysisMode::FakeRate { scenario } => AnalysisMode::FakeRate { scenario },
                AnalysisMode::Efficiency => AnalysisMode::FakeRate {
                    scenario: FakeScenario::GenJets,
                },
            },
            (None, None) => config.mode,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(mode: Option<ModeArg>, scenario: Option<ScenarioArg>) -> AnalysisArgs {
        AnalysisArgs {
            config: None,
            dr_max: None,
            mode,
            scenario,
            isolate_gen_taus: false,
        }
    }

    #[test]
    fn test_defaults_from_embedded_config() {
        let config = args(None, None).load_config().unwrap();
        assert_eq!(config.mode, AnalysisMode::Efficiency);
    }

    #[test]
    fn test_scenario_implies_fake_rate() {
        let config = args(None, Some(ScenarioArg::FakeMuons))
            .load_config()
            .unwrap();
        assert_eq!(
            config.mode,
            AnalysisMode::FakeRate {
                scenario: FakeScenario::FakeMuons
            }
        );
    }

    #[test]
    fn test_fake_rate_defaults_to_gen_jets() {
        let config = args(Some(ModeArg::FakeRate), None).load_config().unwrap();
        assert_eq!(
            config.mode,
            AnalysisMode::FakeRate {
                scenario: FakeScenario::GenJets
            }
        );
    }

    #[test]
    fn test_conflicting_mode_flags() {
        assert!(args(Some(ModeArg::Efficiency), Some(ScenarioArg::GenJets))
            .load_config()
            .is_err());
    }

    #[test]
    fn test_dr_max_override_is_validated() {
        let mut analysis = args(None, None);
        analysis.dr_max = Some(0.3);
        let config = analysis.load_config().unwrap();
        assert!((config.matching.max_radius - 0.3).abs() < 1e-12);

        analysis.dr_max = Some(-0.1);
        assert!(analysis.load_config().is_err());
    }

    #[test]
    fn test_isolation_flag() {
        let mut analysis = args(None, None);
        assert!(!analysis.load_config().unwrap().isolate_gen_taus);

        analysis.isolate_gen_taus = true;
        let config = analysis.load_config().unwrap();
        assert_eq!(config.reference_isolation(), Some(0.5));
    }
}
