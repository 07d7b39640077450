use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::cli::{AnalysisArgs, OutputFormat};
use crate::core::position::Position;
use crate::core::types::MatchObject;
use crate::matching::engine::{EventMatch, MatchingEngine};
use crate::parsing::open_events;

#[derive(Args)]
pub struct MatchArgs {
    /// Event file (.json, .jsonl, .ndjson, optionally .gz); '-' reads JSON lines from stdin
    #[arg(required = true)]
    pub events: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Stop after this many events
    #[arg(short = 'n', long)]
    pub max_events: Option<u64>,

    /// Only report events where a tau was claimed more than once
    #[arg(long)]
    pub conflicts_only: bool,
}

#[derive(Debug, Serialize)]
struct MatchedPair {
    reference: usize,
    candidate: usize,
    delta_r: f64,
}

#[derive(Debug, Serialize)]
struct EventReport {
    /// 1-based position of the event in the input
    event: usize,
    references: Vec<usize>,
    candidates: usize,
    matches: Vec<MatchedPair>,
    unmatched: Vec<usize>,
    duplicate_count: usize,
    conflicting_refs: Vec<usize>,
    shared_candidates: BTreeSet<usize>,
}

impl EventReport {
    fn new(
        event: usize,
        references: &[MatchObject],
        candidates: &[MatchObject],
        result: EventMatch,
    ) -> Self {
        let ref_positions: HashMap<usize, Position> =
            references.iter().map(|o| (o.index, o.position)).collect();
        let cand_positions: HashMap<usize, Position> =
            candidates.iter().map(|o| (o.index, o.position)).collect();

        let matches = result
            .assignment
            .iter()
            .filter_map(|(&reference, &candidate)| {
                let a = ref_positions.get(&reference)?;
                let b = cand_positions.get(&candidate)?;
                Some(MatchedPair {
                    reference,
                    candidate,
                    delta_r: a.delta_r(b),
                })
            })
            .collect();
        let unmatched = references
            .iter()
            .map(|o| o.index)
            .filter(|i| !result.assignment.contains_key(i))
            .collect();

        Self {
            event,
            references: references.iter().map(|o| o.index).collect(),
            candidates: candidates.len(),
            matches,
            unmatched,
            duplicate_count: result.conflicts.duplicate_count,
            conflicting_refs: result.conflicts.conflicting_refs,
            shared_candidates: result.conflicts.duplicated_candidates,
        }
    }

    fn had_conflict(&self) -> bool {
        self.duplicate_count > 0
    }
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if the config or events cannot be read, or an event is
/// malformed.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.analysis.load_config()?;
    let extra = config.extra_cut_expression()?;
    let veto = config.pollution_veto();
    let selector = config.reference_selector(extra.as_ref(), veto.as_ref());
    let mut engine = MatchingEngine::new(config.matching);

    let events = open_events(&args.events)
        .with_context(|| format!("Failed to open {}", args.events.display()))?;

    let mut reports = Vec::new();
    for (i, event) in events.enumerate() {
        if args.max_events.is_some_and(|max| engine.events() >= max) {
            break;
        }
        let number = i + 1;
        let event = event.with_context(|| format!("Failed to read event {number}"))?;
        let references = selector
            .select(&event)
            .with_context(|| format!("Failed to select references in event {number}"))?;
        let candidates = event
            .collection(&config.comparison_tau)
            .with_context(|| format!("Failed to read taus in event {number}"))?;
        let result = engine
            .match_event_detailed(&references, &candidates)
            .with_context(|| format!("Failed to match event {number}"))?;

        let report = EventReport::new(number, &references, &candidates, result);
        if !args.conflicts_only || report.had_conflict() {
            reports.push(report);
        }
    }

    let reference_name = config.reference_collection();
    match format {
        OutputFormat::Text => {
            print_text_reports(&reports, reference_name, &config.comparison_tau);
            print_totals(&engine);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "reference_collection": reference_name,
                "candidate_collection": config.comparison_tau,
                "dr_max": config.matching.max_radius,
                "events": engine.events(),
                "double_counts": engine.tally(),
                "reports": reports,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            print_tsv_reports(&reports);
            if verbose {
                print_totals(&engine);
            }
        }
    }

    Ok(())
}

fn print_text_reports(reports: &[EventReport], reference_name: &str, tau_name: &str) {
    for report in reports {
        println!(
            "Event {}: {} references, {} taus",
            report.event,
            report.references.len(),
            report.candidates
        );
        for pair in &report.matches {
            println!(
                "   {reference_name} {} -> {tau_name} {} (dR {:.4})",
                pair.reference, pair.candidate, pair.delta_r
            );
        }
        for reference in &report.unmatched {
            println!("   {reference_name} {reference} unmatched");
        }
        if report.had_conflict() {
            println!(
                "   Conflict: {} duplicate(s), references {:?} shared {tau_name} {:?}",
                report.duplicate_count, report.conflicting_refs, report.shared_candidates
            );
        }
    }
}

fn print_tsv_reports(reports: &[EventReport]) {
    println!("event\treference\tcandidate\tdelta_r\tconflict");
    for report in reports {
        let conflicting: BTreeSet<usize> = report.conflicting_refs.iter().copied().collect();
        for pair in &report.matches {
            println!(
                "{}\t{}\t{}\t{:.6}\t{}",
                report.event,
                pair.reference,
                pair.candidate,
                pair.delta_r,
                conflicting.contains(&pair.reference)
            );
        }
        for reference in &report.unmatched {
            println!(
                "{}\t{reference}\t-\t-\t{}",
                report.event,
                conflicting.contains(reference)
            );
        }
    }
}

fn print_totals(engine: &MatchingEngine) {
    let events = engine.events();
    let double_counts = engine.tally().count();
    #[allow(clippy::cast_precision_loss)]
    let rate = if events == 0 {
        0.0
    } else {
        double_counts as f64 / events as f64
    };
    eprintln!("Matched {events} events, {double_counts} with double counts (rate {rate:.4})");
}
