use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::{AnalysisArgs, OutputFormat};
use crate::ntuple::{create_writer, NtupleBuilder, NtupleFormat, NtupleSummary};
use crate::parsing::open_events;

#[derive(Args)]
pub struct NtupleArgs {
    /// Event file (.json, .jsonl, .ndjson, optionally .gz); '-' reads JSON lines from stdin
    #[arg(required = true)]
    pub events: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many events
    #[arg(short = 'n', long)]
    pub max_events: Option<u64>,

    /// Log progress every N events
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub log_every: u64,
}

/// Periodic progress lines with rate and estimated completion time
struct Progress {
    start: Instant,
    total: Option<u64>,
    every: u64,
}

impl Progress {
    fn new(total: Option<u64>, every: u64) -> Self {
        Self {
            start: Instant::now(),
            total,
            every,
        }
    }

    fn update(&self, processed: u64, summary: &NtupleSummary) {
        if processed == 0 || processed % self.every != 0 {
            return;
        }

        let elapsed = self.start.elapsed().as_secs_f64().max(1e-3);
        #[allow(clippy::cast_precision_loss)]
        let rate = processed as f64 / elapsed;

        match self.total {
            Some(total) if total > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let percent = processed as f64 / total as f64 * 100.0;
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let remaining_ms = (total.saturating_sub(processed) as f64 / rate * 1000.0) as i64;
                let eta = chrono::Local::now() + chrono::Duration::milliseconds(remaining_ms);
                info!(
                    "Processing event {processed} / {total} ({percent:.1}%), {rate:.1} ev/s, ETA {}, double-count rate {:.4}",
                    eta.format("%Y-%m-%d %H:%M:%S"),
                    summary.double_count_rate()
                );
            }
            _ => info!(
                "Processing event {processed}, {rate:.1} ev/s, double-count rate {:.4}",
                summary.double_count_rate()
            ),
        }
    }
}

/// Execute ntuple subcommand
///
/// # Errors
///
/// Returns an error if the config or events cannot be read, an event is
/// malformed, or the output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: NtupleArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.analysis.load_config()?;
    if verbose {
        eprintln!(
            "Mode: {}, references: {}, taus: {}, opposite: {}, dR < {}",
            config.mode,
            config.reference_collection(),
            config.comparison_tau,
            config.opposite_collection(),
            config.matching.max_radius
        );
    }

    let mut builder = NtupleBuilder::new(config)?;

    let events = open_events(&args.events)
        .with_context(|| format!("Failed to open {}", args.events.display()))?;
    let known = events.size_hint().1.map(|n| n as u64);
    let total = match (known, args.max_events) {
        (Some(n), Some(max)) => Some(n.min(max)),
        (known, max) => known.or(max),
    };
    let progress = Progress::new(total, args.log_every);

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let ntuple_format = match format {
        OutputFormat::Json => NtupleFormat::JsonLines,
        OutputFormat::Text | OutputFormat::Tsv => NtupleFormat::Tsv,
    };
    let mut writer = create_writer(ntuple_format, out, builder.columns())?;

    let mut processed = 0u64;
    for (i, event) in events.enumerate() {
        if args.max_events.is_some_and(|max| processed >= max) {
            break;
        }
        let number = i + 1;
        let event = event.with_context(|| format!("Failed to read event {number}"))?;
        let rows = builder
            .process_event(&event)
            .with_context(|| format!("Failed to process event {number}"))?;
        for row in &rows {
            writer.write_row(row)?;
        }
        processed += 1;
        progress.update(processed, &builder.summary());
    }
    writer.finish()?;

    print_summary(&builder.summary(), verbose || args.output.is_some());
    Ok(())
}

fn print_summary(summary: &NtupleSummary, show: bool) {
    if !show {
        return;
    }
    eprintln!(
        "Processed {} events: {} rows, {} matched, {} with opposite object",
        summary.events, summary.rows, summary.matched_rows, summary.opposite_rows
    );
    eprintln!(
        "Double counts: {} events ({:.4} of events)",
        summary.double_counts,
        summary.double_count_rate()
    );
}
