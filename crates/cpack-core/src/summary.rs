//! Per-run statistics and the rendered summary block.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;

use crate::error::PackWarning;

/// Opening line of the summary block.
pub const SUMMARY_HEADER: &str = "--- CORPUS PACKER SUMMARY ---";

/// Closing line of the summary block.
pub const SUMMARY_FOOTER: &str = "--- END OF SUMMARY ---";

/// Statistics accumulated over one packing run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Relative paths packed into the output, in walk order until finalized.
    pub processed: IndexSet<String>,
    /// Relative paths that were seen but not packed.
    pub skipped: IndexSet<String>,
    /// Bytes read from packed files (before any transform).
    pub total_bytes: u64,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run, set by [`RunSummary::finish`].
    pub finished_at: Option<DateTime<Utc>>,
    /// Recoverable problems hit during the run.
    pub warnings: Vec<PackWarning>,
    #[serde(skip)]
    clock: Instant,
    elapsed: Duration,
}

impl RunSummary {
    /// Start a new summary; the clock starts now.
    pub fn start() -> Self {
        Self {
            processed: IndexSet::new(),
            skipped: IndexSet::new(),
            total_bytes: 0,
            started_at: Utc::now(),
            finished_at: None,
            warnings: Vec::new(),
            clock: Instant::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Record a packed file.
    pub fn record_processed(&mut self, rel_path: impl Into<String>, bytes: u64) {
        if self.processed.insert(rel_path.into()) {
            self.total_bytes += bytes;
        }
    }

    /// Record a file that was not packed.
    pub fn record_skipped(&mut self, rel_path: impl Into<String>) {
        self.skipped.insert(rel_path.into());
    }

    /// Record a recoverable warning.
    pub fn record_warning(&mut self, warning: PackWarning) {
        self.warnings.push(warning);
    }

    /// Stop the clock and sort both path lists.
    pub fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.elapsed = self.clock.elapsed();
            self.finished_at = Some(Utc::now());
        }
        self.processed.sort();
        self.skipped.sort();
    }

    /// Time spent between [`RunSummary::start`] and [`RunSummary::finish`].
    pub fn elapsed(&self) -> Duration {
        if self.finished_at.is_some() {
            self.elapsed
        } else {
            self.clock.elapsed()
        }
    }

    /// Number of files seen (processed + skipped).
    pub fn total_files(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }

    /// Check if there were any warnings during the run.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Render the summary block placed ahead of the packed content.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{SUMMARY_HEADER}");
        let _ = writeln!(out, "Processing Time: {:?}", self.elapsed());
        let _ = writeln!(out, "Total Files: {}", self.total_files());
        let _ = writeln!(out, "Total Files Processed: {}", self.processed.len());
        let _ = writeln!(out, "Total Files Skipped: {}", self.skipped.len());
        let _ = writeln!(out, "Total Bytes Processed: {}", self.total_bytes);
        let _ = writeln!(out);
        let _ = writeln!(out, "Processed Files:");
        let _ = writeln!(out, "{}", join_lines(&self.processed));
        let _ = writeln!(out);
        let _ = writeln!(out, "Skipped Files:");
        let _ = writeln!(out, "{}", join_lines(&self.skipped));
        let _ = writeln!(out);
        let _ = writeln!(out, "{SUMMARY_FOOTER}");
        let _ = writeln!(out);
        out
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::start()
    }
}

fn join_lines(paths: &IndexSet<String>) -> String {
    paths.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_dedupes_paths() {
        let mut summary = RunSummary::start();
        summary.record_processed("a.go", 10);
        summary.record_processed("a.go", 10);
        summary.record_skipped("b.txt");
        summary.record_skipped("b.txt");

        assert_eq!(summary.processed.len(), 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.total_bytes, 10);
        assert_eq!(summary.total_files(), 2);
    }

    #[test]
    fn test_finish_sorts_lists() {
        let mut summary = RunSummary::start();
        summary.record_processed("src/z.go", 1);
        summary.record_processed("src/a.go", 1);
        summary.finish();

        let paths: Vec<_> = summary.processed.iter().cloned().collect();
        assert_eq!(paths, vec!["src/a.go".to_string(), "src/z.go".to_string()]);
        assert!(summary.finished_at.is_some());
    }

    #[test]
    fn test_render_layout() {
        let mut summary = RunSummary::start();
        summary.record_processed("pkg/a.go", 12);
        summary.record_skipped("pkg/a_test.go");
        summary.finish();

        let text = summary.render();
        assert!(text.starts_with("--- CORPUS PACKER SUMMARY ---\nProcessing Time: "));
        assert!(text.contains("Total Files: 2\n"));
        assert!(text.contains("Total Files Processed: 1\n"));
        assert!(text.contains("Total Files Skipped: 1\n"));
        assert!(text.contains("Total Bytes Processed: 12\n"));
        assert!(text.contains("\nProcessed Files:\npkg/a.go\n\nSkipped Files:\npkg/a_test.go\n\n"));
        assert!(text.ends_with("--- END OF SUMMARY ---\n\n"));
    }
}
