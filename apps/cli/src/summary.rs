//! End-of-run summary printed after the progress bar clears.

use std::collections::BTreeMap;
use std::path::Path;

use ceofinder_shared::{RunPhase, RunState};
use ceofinder_table::Table;

/// How many found rows to show as a sample.
const SAMPLE_ROWS: usize = 10;

pub(crate) fn print_run_summary(table: &Table, state: &RunState, output_path: &Path) {
    let records = table.records();
    let found: Vec<_> = records.iter().filter(|r| r.has_ceo()).collect();

    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_confidence: BTreeMap<String, usize> = BTreeMap::new();
    for record in &found {
        if let Some(source) = &record.source {
            *by_source.entry(source.clone()).or_insert(0) += 1;
        }
        if let Some(confidence) = &record.confidence {
            *by_confidence.entry(confidence.clone()).or_insert(0) += 1;
        }
    }

    println!();
    match state.phase {
        RunPhase::Cancelled => println!("  Run cancelled — partial results saved."),
        _ => println!("  Run complete."),
    }
    println!();
    println!("  Processed:  {} of {}", state.processed, state.total);
    println!("  With CEO:   {}", found.len());
    println!("  Unresolved: {}", state.failed);

    if !by_source.is_empty() {
        println!();
        println!("  By source:");
        for (source, count) in &by_source {
            println!("    {source:<14} {count}");
        }
    }
    if !by_confidence.is_empty() {
        println!();
        println!("  By confidence:");
        for (confidence, count) in &by_confidence {
            println!("    {confidence:<14} {count}");
        }
    }

    let sample: Vec<_> = found.iter().take(SAMPLE_ROWS).collect();
    if !sample.is_empty() {
        println!();
        println!("  Sample:");
        for record in sample {
            let name = record.ceo_name.as_deref().unwrap_or("?");
            let linkedin = record.ceo_linkedin.as_deref().unwrap_or("");
            println!("    {:<28} {name:<24} {linkedin}", record.company);
        }
        if found.len() > SAMPLE_ROWS {
            println!("    ... and {} more", found.len() - SAMPLE_ROWS);
        }
    }

    println!();
    println!("  Saved to: {}", output_path.display());
    println!();
}
