//! Output formatting module
//!
//! Handles:
//! - Human-readable run summaries
//! - JSON output of the same data
//! - End-of-run warnings for non-fatal issues

use anyhow::Result;
use serde::Serialize;

use crate::models::EnrichmentSummary;
use crate::pipeline::AuditReport;

pub mod progress;

/// Print any serializable run result as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{}ms", (seconds * 1000.0).round() as u64)
    } else {
        format!("{:.2}s", seconds)
    }
}

/// Lines describing an enrichment run
pub fn enrichment_lines(summary: &EnrichmentSummary) -> Vec<String> {
    let chunking = &summary.chunking;
    vec![
        "Enrichment Summary:".to_string(),
        format!("  Output: {}", summary.output_file),
        format!(
            "  Tooltips added: {} (of {} entries)",
            summary.tooltips_added, summary.entries_processed
        ),
        format!(
            "  Chunks: {} x {} entries",
            chunking.total_chunks, chunking.chunk_size
        ),
        format!("  Duration: {}", format_duration(chunking.processing_time_seconds)),
        format!("  Rate: {:.1} entries/s", chunking.processing_rate_per_second),
        format!("  Features: {}", summary.features.join(", ")),
    ]
}

/// Warning lines for non-fatal issues, empty when the run was clean
pub fn warning_lines(report: &AuditReport) -> Vec<String> {
    let mut lines = Vec::new();
    if !report.records_skipped.is_empty() {
        lines.push(format!(
            "  {} permission record(s) skipped as unreadable",
            report.records_skipped.len()
        ));
    }
    for warning in &report.pattern_warnings {
        lines.push(format!(
            "  Exclusion pattern {}:{} ignored: {}",
            warning.origin, warning.source_line, warning.pattern
        ));
    }
    let unused = report.per_pattern_counts.values().filter(|count| **count == 0).count();
    if unused > 0 {
        lines.push(format!("  {} exclusion pattern(s) matched nothing", unused));
    }
    if report.backup_failures > 0 {
        lines.push(format!("  {} backup snapshot(s) could not be written", report.backup_failures));
    }
    lines
}

/// Print the audit result in human-readable format
pub fn format_audit_human(report: &AuditReport) -> Result<()> {
    println!("Audit Summary:");
    println!("  Records: {}", report.records_file);
    println!("  Loaded: {} permissions", report.records_loaded);
    if report.excluded_count > 0 {
        println!("  Excluded: {} permissions", report.excluded_count);
    }
    println!("  Report: {}", report.output_file);
    println!();

    println!("Permissions by category:");
    for (group, count) in report.group_counts.iter().filter(|(_, count)| **count > 0) {
        println!("  {:<16} {}", group.title(), count);
    }
    println!();

    if let Some(summary) = &report.enrichment {
        for line in enrichment_lines(summary) {
            println!("{}", line);
        }
        println!();
    }

    let warnings = warning_lines(report);
    if !warnings.is_empty() {
        println!("Warnings:");
        for line in warnings {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Print an enrichment result in human-readable format
pub fn format_enrich_human(summary: &EnrichmentSummary, backup_failures: usize) -> Result<()> {
    for line in enrichment_lines(summary) {
        println!("{}", line);
    }
    if backup_failures > 0 {
        println!("Warnings:");
        println!("  {} backup snapshot(s) could not be written", backup_failures);
    }
    Ok(())
}
