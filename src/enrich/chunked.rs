//! Chunked enrichment
//!
//! Applies the annotator to a large entry set in fixed-size chunks, checking
//! after every chunk that the document did not grow suspiciously. A chunk
//! that grows the document beyond its size tier's ratio is treated as a
//! duplicate-annotation bug: the partial document is saved as a diagnostic
//! snapshot and the run stops.
//!
//! Processing is sequential. Entries are taken in key order, one chunk at a
//! time, so only one chunk's worth of entries is held at once.
//!
//! Legitimate annotation must never trip the check, so the requested chunk
//! size is capped: a chunk of `n` entries grows the document by at most `n`
//! times the largest span, and that bound has to fit inside the smallest
//! headroom any size tier the document can reach leaves.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{info, warn};
use serde_json::json;

use crate::constants::{
    DEFAULT_BACKUP_INTERVAL, DEFAULT_CHUNK_SIZE, LARGE_DOCUMENT_BYTES, LARGE_DOCUMENT_GROWTH_RATIO,
    MEDIUM_DOCUMENT_GROWTH_RATIO, SMALL_DOCUMENT_BYTES, SMALL_DOCUMENT_GROWTH_RATIO,
};
use crate::enrich::annotator::{annotate_counted, span_growth};
use crate::enrich::assets;
use crate::logging::log_event;
use crate::models::TooltipEntry;
use crate::output::progress::ChunkProgress;

/// Errors that stop an enrichment run
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,

    #[error(
        "Chunk {chunk} grew the document {ratio:.2}x ({before} -> {after} bytes), limit is {threshold:.2}x; \
         partial output saved to {}", .snapshot.display()
    )]
    GrowthAnomaly {
        chunk: usize,
        ratio: f64,
        threshold: f64,
        before: usize,
        after: usize,
        snapshot: PathBuf,
    },

    #[error(
        "Chunk {chunk} grew the document {ratio:.2}x, limit is {threshold:.2}x; \
         failed to save diagnostic snapshot {}: {source}", .path.display()
    )]
    DiagnosticWrite {
        chunk: usize,
        ratio: f64,
        threshold: f64,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum per-chunk growth ratio by document size before the chunk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthThresholds {
    /// Documents smaller than this use `small_ratio`
    pub small_document_bytes: usize,
    /// Documents larger than this use `large_ratio`; in between use `medium_ratio`
    pub large_document_bytes: usize,
    pub small_ratio: f64,
    pub medium_ratio: f64,
    pub large_ratio: f64,
}

impl Default for GrowthThresholds {
    fn default() -> Self {
        Self {
            small_document_bytes: SMALL_DOCUMENT_BYTES,
            large_document_bytes: LARGE_DOCUMENT_BYTES,
            small_ratio: SMALL_DOCUMENT_GROWTH_RATIO,
            medium_ratio: MEDIUM_DOCUMENT_GROWTH_RATIO,
            large_ratio: LARGE_DOCUMENT_GROWTH_RATIO,
        }
    }
}

/// Outcome of one growth check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthCheck {
    pub ratio: f64,
    pub threshold: f64,
    pub exceeded: bool,
}

/// after / before, or 1.0 for an empty starting document
pub fn growth_ratio(before: usize, after: usize) -> f64 {
    if before == 0 {
        1.0
    } else {
        after as f64 / before as f64
    }
}

impl GrowthThresholds {
    pub fn limit_for(&self, before: usize) -> f64 {
        if before < self.small_document_bytes {
            self.small_ratio
        } else if before <= self.large_document_bytes {
            self.medium_ratio
        } else {
            self.large_ratio
        }
    }

    /// Bytes a chunk may add to a document of `size` bytes without tripping the check
    pub fn headroom(&self, size: usize) -> usize {
        let allowed = (self.limit_for(size) - 1.0) * size as f64;
        if allowed > 0.0 {
            allowed.floor() as usize
        } else {
            0
        }
    }

    /// Smallest headroom over every size a document starting at `start` bytes
    /// can grow into. Within a tier headroom rises with size, so only the
    /// start and the first size of each later tier need checking.
    pub fn min_headroom(&self, start: usize) -> usize {
        [self.small_document_bytes, self.large_document_bytes.saturating_add(1)]
            .into_iter()
            .filter(|&boundary| boundary > start)
            .map(|boundary| self.headroom(boundary))
            .fold(self.headroom(start), usize::min)
    }

    pub fn check(&self, before: usize, after: usize) -> GrowthCheck {
        let ratio = growth_ratio(before, after);
        let threshold = self.limit_for(before);
        GrowthCheck {
            ratio,
            threshold,
            exceeded: ratio > threshold,
        }
    }
}

/// Writes numbered backup and diagnostic snapshots next to the output file
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    stem: String,
    extension: String,
}

impl SnapshotWriter {
    /// Snapshots for `report.html` become `report.backup_chunk_005.html` and
    /// `report.DIAGNOSTIC_chunk_007.html` in the same directory
    pub fn for_output(output: &Path) -> Self {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "report".to_string());
        let extension = output
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "html".to_string());

        Self { dir, stem, extension }
    }

    pub fn backup_path(&self, chunk: usize) -> PathBuf {
        self.dir.join(format!("{}.backup_chunk_{:03}.{}", self.stem, chunk, self.extension))
    }

    pub fn diagnostic_path(&self, chunk: usize) -> PathBuf {
        self.dir.join(format!("{}.DIAGNOSTIC_chunk_{:03}.{}", self.stem, chunk, self.extension))
    }

    fn write(&self, path: PathBuf, document: &str) -> std::io::Result<PathBuf> {
        fs::write(&path, document)?;
        Ok(path)
    }

    pub fn write_backup(&self, chunk: usize, document: &str) -> std::io::Result<PathBuf> {
        self.write(self.backup_path(chunk), document)
    }

    pub fn write_diagnostic(&self, chunk: usize, document: &str) -> std::io::Result<PathBuf> {
        self.write(self.diagnostic_path(chunk), document)
    }
}

/// Style and script blocks injected once after the last chunk
#[derive(Debug, Clone)]
pub struct InjectedAssets {
    pub style: String,
    pub behavior: String,
}

/// Settings for one chunked run
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub chunk_size: usize,
    pub backup_interval: usize,
    pub thresholds: GrowthThresholds,
    pub assets: Option<InjectedAssets>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            backup_interval: DEFAULT_BACKUP_INTERVAL,
            thresholds: GrowthThresholds::default(),
            assets: None,
        }
    }
}

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichState {
    Idle,
    Chunking { chunk: usize, total: usize },
    Completed,
    Aborted { chunk: usize },
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub document: String,
    pub tooltips_added: usize,
    pub entries_processed: usize,
    pub chunk_size: usize,
    pub total_chunks: usize,
    pub elapsed: Duration,
    pub backups: Vec<PathBuf>,
    /// Backup snapshots that could not be written
    pub backup_failures: usize,
}

impl EnrichmentOutcome {
    /// Entries processed per second
    pub fn rate_per_second(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.entries_processed as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Drives the annotator over an entry set chunk by chunk
pub struct ChunkedEnricher {
    options: ChunkOptions,
    snapshots: SnapshotWriter,
    progress: Option<ChunkProgress>,
    state: EnrichState,
}

impl ChunkedEnricher {
    pub fn new(options: ChunkOptions, snapshots: SnapshotWriter) -> Self {
        Self {
            options,
            snapshots,
            progress: None,
            state: EnrichState::Idle,
        }
    }

    /// Report chunk progress on stderr
    pub fn with_progress(mut self, progress: ChunkProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> EnrichState {
        self.state
    }

    fn is_backup_chunk(&self, chunk: usize, total: usize) -> bool {
        chunk == total || (self.options.backup_interval > 0 && chunk % self.options.backup_interval == 0)
    }

    /// Annotate `document` with every entry, in key order
    pub fn run(
        &mut self,
        document: String,
        entries: &BTreeMap<String, TooltipEntry>,
    ) -> Result<EnrichmentOutcome, EnrichError> {
        if self.options.chunk_size == 0 {
            return Err(EnrichError::InvalidChunkSize);
        }
        let chunk_size = self.safe_chunk_size(document.len(), entries);

        let started = Instant::now();
        let total_chunks = entries.len().div_ceil(chunk_size);
        let mut document = document;
        let mut tooltips_added = 0;
        let mut entries_processed = 0;
        let mut backups = Vec::new();
        let mut backup_failures = 0;

        log_event(
            log::Level::Info,
            "enrichment_started",
            &json!({
                "entries": entries.len(),
                "chunk_size": chunk_size,
                "total_chunks": total_chunks,
                "document_bytes": document.len(),
            }),
        );

        if let Some(progress) = self.progress.as_mut() {
            progress.start(total_chunks, entries.len());
        }

        let mut remaining = entries.iter();
        for chunk in 1..=total_chunks {
            self.state = EnrichState::Chunking { chunk, total: total_chunks };

            let batch: Vec<(&String, &TooltipEntry)> = remaining.by_ref().take(chunk_size).collect();
            let before = document.len();
            let (annotated, added) = annotate_counted(&document, batch.iter().copied());
            let after = annotated.len();
            document = annotated;

            let check = self.options.thresholds.check(before, after);
            if check.exceeded {
                self.state = EnrichState::Aborted { chunk };
                if let Some(progress) = self.progress.as_mut() {
                    progress.abort(chunk);
                }
                return Err(self.abort(chunk, check, before, after, &document));
            }

            tooltips_added += added;
            entries_processed += batch.len();
            drop(batch);

            info!(
                "Chunk {}/{}: {} tooltip(s) added, {} -> {} bytes ({:.2}x)",
                chunk, total_chunks, added, before, after, check.ratio
            );
            if let Some(progress) = self.progress.as_mut() {
                progress.chunk_done(chunk, entries_processed, after);
            }

            if self.is_backup_chunk(chunk, total_chunks) {
                match self.snapshots.write_backup(chunk, &document) {
                    Ok(path) => backups.push(path),
                    Err(err) => {
                        backup_failures += 1;
                        warn!(
                            "Could not write backup {}: {}",
                            self.snapshots.backup_path(chunk).display(),
                            err
                        );
                    }
                }
            }
        }

        if let Some(assets) = &self.options.assets {
            document = assets::inject(&document, &assets.style, &assets.behavior);
        }

        let elapsed = started.elapsed();
        self.state = EnrichState::Completed;
        if let Some(progress) = self.progress.as_mut() {
            progress.complete(tooltips_added);
        }

        let outcome = EnrichmentOutcome {
            document,
            tooltips_added,
            entries_processed,
            chunk_size,
            total_chunks,
            elapsed,
            backups,
            backup_failures,
        };

        log_event(
            log::Level::Info,
            "enrichment_completed",
            &json!({
                "tooltips_added": outcome.tooltips_added,
                "entries_processed": outcome.entries_processed,
                "total_chunks": outcome.total_chunks,
                "seconds": outcome.elapsed.as_secs_f64(),
                "rate_per_second": outcome.rate_per_second(),
            }),
        );

        Ok(outcome)
    }

    /// Requested chunk size, lowered so that a chunk of real annotations
    /// stays within the growth limit of every tier the document can reach
    pub fn safe_chunk_size(&self, document_bytes: usize, entries: &BTreeMap<String, TooltipEntry>) -> usize {
        let requested = self.options.chunk_size;
        let largest_span = entries
            .iter()
            .map(|(key, entry)| span_growth(key, entry))
            .max()
            .unwrap_or(0);
        if largest_span == 0 {
            return requested;
        }

        let fitting = (self.options.thresholds.min_headroom(document_bytes) / largest_span).max(1);
        // A cap that still covers every entry in one chunk changes nothing
        if fitting < requested && fitting < entries.len() {
            info!(
                "Chunk size lowered from {} to {}: {} byte document, tooltips up to {} bytes",
                requested, fitting, document_bytes, largest_span
            );
            fitting
        } else {
            requested
        }
    }

    fn abort(&self, chunk: usize, check: GrowthCheck, before: usize, after: usize, document: &str) -> EnrichError {
        log_event(
            log::Level::Error,
            "enrichment_aborted",
            &json!({
                "chunk": chunk,
                "ratio": check.ratio,
                "threshold": check.threshold,
                "before_bytes": before,
                "after_bytes": after,
            }),
        );

        match self.snapshots.write_diagnostic(chunk, document) {
            Ok(snapshot) => EnrichError::GrowthAnomaly {
                chunk,
                ratio: check.ratio,
                threshold: check.threshold,
                before,
                after,
                snapshot,
            },
            Err(source) => EnrichError::DiagnosticWrite {
                chunk,
                ratio: check.ratio,
                threshold: check.threshold,
                path: self.snapshots.diagnostic_path(chunk),
                source,
            },
        }
    }
}
