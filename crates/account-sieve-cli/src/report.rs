use std::fmt::Write as _;

use account_sieve_core::{PipelineOutcome, PipelineStats, Record};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    elapsed_ms: u64,
    incomplete: Option<&'a str>,
    pages: usize,
    stats: &'a PipelineStats,
    records: &'a [Record],
}

fn elapsed_ms(outcome: &PipelineOutcome) -> u64 {
    u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[must_use]
pub fn render_text(outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Time elapsed: {} ms", elapsed_ms(outcome));
    let _ = writeln!(out, "{} results sorted by name: ", outcome.records.len());
    for record in &outcome.records {
        let _ = writeln!(out, "{record}");
    }
    out
}

/// # Errors
/// Propagates serialization failures.
pub fn render_json(outcome: &PipelineOutcome) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        elapsed_ms: elapsed_ms(outcome),
        incomplete: outcome.incomplete.as_deref(),
        pages: outcome.stats.pages,
        stats: &outcome.stats,
        records: &outcome.records,
    })
}
