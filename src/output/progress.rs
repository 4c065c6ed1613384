//! Progress indicator for chunked enrichment
//!
//! Shows a single updating line on stderr with the current chunk, entries
//! processed and document size, then a completion or abort line.

use std::io::{self, Write};

/// Progress display for a chunked run
pub struct ChunkProgress {
    quiet_mode: bool,
    total_chunks: usize,
    total_entries: usize,
    active: bool,
}

impl ChunkProgress {
    pub fn new(quiet_mode: bool) -> Self {
        Self {
            quiet_mode,
            total_chunks: 0,
            total_entries: 0,
            active: false,
        }
    }

    pub fn start(&mut self, total_chunks: usize, total_entries: usize) {
        self.total_chunks = total_chunks;
        self.total_entries = total_entries;
        self.active = true;

        if self.quiet_mode {
            return;
        }
        eprint!("\rEnriching {} entries in {} chunk(s)...", total_entries, total_chunks);
        io::stderr().flush().unwrap_or(());
    }

    pub fn chunk_done(&mut self, chunk: usize, processed: usize, document_bytes: usize) {
        if self.quiet_mode {
            return;
        }
        eprint!(
            "\rChunk {}/{} - {}/{} entries, document {} KB   ",
            chunk,
            self.total_chunks,
            processed,
            self.total_entries,
            document_bytes / 1024
        );
        io::stderr().flush().unwrap_or(());
    }

    pub fn complete(&mut self, tooltips_added: usize) {
        self.active = false;
        if self.quiet_mode {
            return;
        }
        eprint!("\r");
        eprintln!(
            "✓ Processed {} chunk(s), {} tooltip(s) added - completed",
            self.total_chunks, tooltips_added
        );
        io::stderr().flush().unwrap_or(());
    }

    pub fn abort(&mut self, chunk: usize) {
        self.active = false;
        if self.quiet_mode {
            return;
        }
        eprint!("\r");
        eprintln!("✗ Aborted at chunk {}/{}", chunk, self.total_chunks);
        io::stderr().flush().unwrap_or(());
    }

    /// Finish the progress line if the run ended without complete/abort
    pub fn finish(&mut self) {
        if self.active && !self.quiet_mode {
            eprintln!();
            io::stderr().flush().unwrap_or(());
        }
        self.active = false;
    }
}

impl Drop for ChunkProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_lifecycle() {
        let mut progress = ChunkProgress::new(true);
        progress.start(3, 7);
        assert!(progress.active);
        assert_eq!(progress.total_chunks, 3);
        progress.chunk_done(1, 3, 4096);
        progress.complete(7);
        assert!(!progress.active);
    }

    #[test]
    fn test_abort_deactivates() {
        let mut progress = ChunkProgress::new(true);
        progress.start(2, 2);
        progress.abort(1);
        assert!(!progress.active);
    }
}
