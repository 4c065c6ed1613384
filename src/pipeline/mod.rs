//! Audit and enrichment pipelines
//!
//! Ties the pieces together for the two commands:
//! - audit: records -> exclusion -> classification -> base report -> enrichment
//! - enrich: existing report + tooltip data -> enrichment
//!
//! Final outputs are written through a temporary sibling file and renamed, so
//! an aborted run never leaves a partial file under the output name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::classify::classify;
use crate::config::AuditConfiguration;
use crate::enrich::chunked::{ChunkedEnricher, SnapshotWriter};
use crate::enrich::{build_entries, load_entries, save_entries};
use crate::exclusion::{self, PatternWarning};
use crate::inventory::{load_records, SkippedRecord};
use crate::models::{ChunkingSummary, EnrichmentSummary, PermissionGroup, TooltipEntry};
use crate::output::progress::ChunkProgress;
use crate::report::{render_report, ExclusionSummary, ReportMeta};

/// Inputs of the audit command
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub records_path: PathBuf,
    pub output_path: PathBuf,
    pub config: AuditConfiguration,
    pub quiet: bool,
}

/// Inputs of the enrich command
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub input_path: PathBuf,
    pub tooltips_path: PathBuf,
    pub output_path: PathBuf,
    pub config: AuditConfiguration,
    pub quiet: bool,
}

/// Everything an audit run produced, including non-fatal issues
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub records_file: String,
    pub output_file: String,
    pub records_loaded: usize,
    pub records_skipped: Vec<SkippedRecord>,
    pub excluded_count: usize,
    pub per_pattern_counts: BTreeMap<String, usize>,
    pub pattern_warnings: Vec<PatternWarning>,
    pub group_counts: BTreeMap<PermissionGroup, usize>,
    pub tooltip_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentSummary>,
    pub backup_failures: usize,
}

/// `<dir>/<stem>.<suffix>` next to the output file
fn sibling(output: &Path, suffix: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    output.with_file_name(format!("{}.{}", stem, suffix))
}

/// Path of the run summary record for an output file
pub fn summary_path(output: &Path) -> PathBuf {
    sibling(output, "summary.json")
}

/// Path of the tooltip side-channel written by the audit command
pub fn tooltip_path(output: &Path) -> PathBuf {
    sibling(output, "tooltips.json")
}

/// Write `content` to `path` via a temporary sibling and rename
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let temp = sibling(path, "partial");
    fs::write(&temp, content).with_context(|| format!("Failed to write {}", temp.display()))?;
    fs::rename(&temp, path).with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(())
}

/// Enrich a document and write the output and summary record.
/// Returns the summary and the number of backup snapshots that failed.
pub fn enrich_document(
    document: String,
    entries: &BTreeMap<String, TooltipEntry>,
    config: &AuditConfiguration,
    input_label: &str,
    output_path: &Path,
    quiet: bool,
) -> Result<(EnrichmentSummary, usize)> {
    let mut enricher = ChunkedEnricher::new(config.chunk_options(), SnapshotWriter::for_output(output_path))
        .with_progress(ChunkProgress::new(quiet));

    let outcome = enricher.run(document, entries)?;

    write_atomically(output_path, &outcome.document)?;

    let summary = EnrichmentSummary {
        input_file: input_label.to_string(),
        output_file: output_path.display().to_string(),
        tooltips_added: outcome.tooltips_added,
        entries_processed: outcome.entries_processed,
        chunking: ChunkingSummary {
            chunk_size: outcome.chunk_size,
            total_chunks: outcome.total_chunks,
            processing_time_seconds: outcome.elapsed.as_secs_f64(),
            processing_rate_per_second: outcome.rate_per_second(),
        },
        enhancement_timestamp: Utc::now().to_rfc3339(),
        features: config.features(),
    };

    let summary_file = summary_path(output_path);
    fs::write(&summary_file, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {}", summary_file.display()))?;

    info!(
        "Enriched {} with {} tooltip(s) in {} chunk(s)",
        output_path.display(),
        summary.tooltips_added,
        summary.chunking.total_chunks
    );

    Ok((summary, outcome.backup_failures))
}

/// Run the full audit pipeline
pub fn run_audit(options: &AuditOptions) -> Result<AuditReport> {
    let config = &options.config;

    let exclusions = config.exclusion_set()?;
    let load = load_records(&options.records_path)?;
    let records_loaded = load.records.len();

    let outcome = exclusion::filter(load.records, &exclusions);
    let classification = classify(&outcome.kept);

    let meta = ReportMeta {
        title: config.report.title.clone(),
        generated_at: Utc::now(),
        source: Some(options.records_path.display().to_string()),
    };
    let exclusion_summary = (!exclusions.is_empty()).then(|| ExclusionSummary {
        excluded_count: outcome.excluded_count,
        per_pattern_counts: outcome.per_pattern_counts.clone(),
    });
    let document = render_report(&classification, exclusion_summary.as_ref(), &meta);

    let catalog = config.role_catalog();
    let entries = build_entries(&outcome.kept, &catalog);
    let tooltip_file = tooltip_path(&options.output_path);
    save_entries(&tooltip_file, &entries)?;

    let (enrichment, backup_failures) = if config.tooltips.enabled {
        let (summary, failures) = enrich_document(
            document,
            &entries,
            config,
            &options.records_path.display().to_string(),
            &options.output_path,
            options.quiet,
        )?;
        (Some(summary), failures)
    } else {
        write_atomically(&options.output_path, &document)?;
        (None, 0)
    };

    Ok(AuditReport {
        records_file: options.records_path.display().to_string(),
        output_file: options.output_path.display().to_string(),
        records_loaded,
        records_skipped: load.skipped,
        excluded_count: outcome.excluded_count,
        per_pattern_counts: outcome.per_pattern_counts,
        pattern_warnings: exclusions.warnings,
        group_counts: classification.counts,
        tooltip_file: tooltip_file.display().to_string(),
        enrichment,
        backup_failures,
    })
}

/// Run the enrichment pipeline on an existing report
pub fn run_enrich(options: &EnrichOptions) -> Result<(EnrichmentSummary, usize)> {
    let document = fs::read_to_string(&options.input_path)
        .with_context(|| format!("Failed to read report {}", options.input_path.display()))?;
    let entries = load_entries(&options.tooltips_path)?;

    enrich_document(
        document,
        &entries,
        &options.config,
        &options.input_path.display().to_string(),
        &options.output_path,
        options.quiet,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let output = Path::new("/tmp/run/report.html");
        assert_eq!(summary_path(output), PathBuf::from("/tmp/run/report.summary.json"));
        assert_eq!(tooltip_path(output), PathBuf::from("/tmp/run/report.tooltips.json"));
    }

    #[test]
    fn test_write_atomically_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        fs::write(&path, "old").unwrap();

        write_atomically(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join("out.partial").exists());
    }
}
