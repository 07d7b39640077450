use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::cli::OutputFormat;
use crate::config::AnalysisConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective analysis config
    Show {
        /// Path to custom config file (defaults to embedded)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a config file for errors
    Validate {
        /// Config file to check
        #[arg(required = true)]
        file: PathBuf,
    },
}

/// Execute config subcommand
///
/// # Errors
///
/// Returns an error if the config cannot be loaded or is invalid.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ConfigArgs, format: OutputFormat, _verbose: bool) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Show { config } => {
            let config = match config {
                Some(path) => AnalysisConfig::load_from_file(&path)?,
                None => AnalysisConfig::load_embedded()?,
            };
            show(&config, format)
        }
        ConfigCommands::Validate { file } => {
            let config = AnalysisConfig::load_from_file(&file)
                .map_err(|e| anyhow::anyhow!("{} is invalid: {e}", file.display()))?;
            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "file": file.display().to_string(),
                        "valid": true,
                        "version": config.version,
                        "mode": config.mode,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text | OutputFormat::Tsv => {
                    println!(
                        "{} is valid (version {}, {})",
                        file.display(),
                        config.version,
                        config.mode
                    );
                }
            }
            Ok(())
        }
    }
}

fn show(config: &AnalysisConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", config.to_json()?),
        OutputFormat::Text => {
            println!("Version:          {}", config.version);
            println!("Mode:             {}", config.mode);
            println!("References:       {}", config.reference_collection());
            println!("Taus:             {}", config.comparison_tau);
            println!("Opposite objects: {}", config.opposite_collection());
            println!("Max dR:           {}", config.matching.max_radius);
            let cuts = config.reference_cuts();
            println!(
                "Quality cuts:     pt >= {}, |eta| <= {}",
                cuts.pt_min, cuts.abs_eta_max
            );
            if let Some(cut) = &config.extra_cut {
                println!("Extra cut:        {cut}");
            }
            if let Some(veto) = config.pollution_veto() {
                println!("Lepton pollution veto: dR < {}", veto.max_dr);
            }
            if let Some(radius) = config.reference_isolation() {
                println!("Isolation:        dR >= {radius}");
            }
            if !config.variables.info.is_empty() {
                println!("Event info:       {}", config.variables.info.join(", "));
            }
        }
        OutputFormat::Tsv => {
            println!("key\tvalue");
            println!("version\t{}", config.version);
            println!("mode\t{}", config.mode);
            println!("reference_collection\t{}", config.reference_collection());
            println!("comparison_tau\t{}", config.comparison_tau);
            println!("opposite_collection\t{}", config.opposite_collection());
            println!("dr_max\t{}", config.matching.max_radius);
            let cuts = config.reference_cuts();
            println!("pt_min\t{}", cuts.pt_min);
            println!("abs_eta_max\t{}", cuts.abs_eta_max);
            println!("veto_lepton_pollution\t{}", config.pollution_veto().is_some());
        }
    }
    Ok(())
}
