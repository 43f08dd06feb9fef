//! Run statistics reporting
//!
//! This module formats the per-seed collection summaries and their totals
//! for display at the end of a run.

use crate::collector::CollectionSummary;
use std::fmt::Write;

/// Totals across several collection runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub seeds: usize,
    pub emitted: u64,
    pub duplicates: u64,
    pub extraction_failures: u64,
    pub out_of_range: u64,
    pub interrupted: usize,
}

impl RunTotals {
    /// Sums a set of summaries
    pub fn from_summaries(summaries: &[CollectionSummary]) -> Self {
        summaries.iter().fold(Self::default(), |mut totals, summary| {
            totals.seeds += 1;
            totals.emitted += summary.emitted;
            totals.duplicates += summary.duplicates;
            totals.extraction_failures += summary.extraction_failures;
            totals.out_of_range += summary.out_of_range;
            if summary.stop_reason.is_some_and(|reason| !reason.is_complete()) {
                totals.interrupted += 1;
            }
            totals
        })
    }
}

/// Formats one collection summary
pub fn format_summary(summary: &CollectionSummary) -> String {
    let mut out = String::new();
    let stop = summary
        .stop_reason
        .map(|reason| reason.to_string())
        .unwrap_or_else(|| "running".to_string());
    let rate = if summary.elapsed.as_secs_f64() > 0.0 {
        summary.emitted as f64 / summary.elapsed.as_secs_f64()
    } else {
        0.0
    };

    let _ = writeln!(out, "=== {} ===", summary.seed);
    let _ = writeln!(out, "  Records emitted: {}", summary.emitted);
    let _ = writeln!(out, "  Duplicates skipped: {}", summary.duplicates);
    let _ = writeln!(out, "  Extraction failures: {}", summary.extraction_failures);
    let _ = writeln!(out, "  Outside date range: {}", summary.out_of_range);
    let _ = writeln!(out, "  Scroll cycles: {}", summary.cycles);

    if summary.legs.len() > 1 {
        for leg in &summary.legs {
            let _ = writeln!(out, "  - {}: {}", leg.label, leg.stop_reason);
        }
    }

    let _ = writeln!(
        out,
        "  Stopped: {} after {:.1}s ({:.2} records/sec)",
        stop,
        summary.elapsed.as_secs_f64(),
        rate
    );
    out
}

/// Prints per-seed summaries and their totals to stdout
///
/// # Arguments
///
/// * `summaries` - Summaries of the seeds collected in this run
pub fn print_summary(summaries: &[CollectionSummary]) {
    println!("=== Collection Statistics ===\n");

    for summary in summaries {
        println!("{}", format_summary(summary));
    }

    let totals = RunTotals::from_summaries(summaries);
    println!("Totals:");
    println!("  Seeds collected: {}", totals.seeds);
    println!("  Records emitted: {}", totals.emitted);
    println!("  Duplicates skipped: {}", totals.duplicates);
    println!("  Extraction failures: {}", totals.extraction_failures);
    if totals.interrupted > 0 {
        println!(
            "  Seeds ended early (interrupted or cancelled): {}",
            totals.interrupted
        );
    }
}
