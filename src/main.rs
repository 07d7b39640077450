use clap::Parser;
use tracing_subscriber::EnvFilter;

use tau_matcher::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("tau_matcher=debug,info")
    } else {
        EnvFilter::new("tau_matcher=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Ntuple(args) => {
            cli::ntuple::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::match_events::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Config(args) => {
            cli::config::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
