//! Operator-facing console lines, separate from `tracing` diagnostics.
//!
//! Verbosity 0 prints nothing, 1 prints banners and one line per post, 2 and
//! above adds per-post comment detail.

use std::io::{self, Write};

use crate::storage::Entry;

/// Summary of one migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Posts newly stored as entries
    pub migrated: usize,
    /// Posts matching an entry from an earlier run
    pub skipped: usize,
    /// Posts that could not be imported
    pub failed: usize,
    /// Comments newly stored across all migrated posts
    pub comments: usize,
}

pub struct Reporter<W: Write> {
    out: W,
    verbosity: u8,
}

impl Reporter<io::Stdout> {
    pub fn stdout(verbosity: u8) -> Self {
        Self::new(io::stdout(), verbosity)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, verbosity: u8) -> Self {
        Self { out, verbosity }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, level: u8, line: &str) {
        if self.verbosity < level {
            return;
        }
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write console output");
        }
    }

    pub fn start(&mut self) {
        self.write_line(
            1,
            concat!("Starting migration from Blogger ", env!("CARGO_PKG_VERSION")),
        );
    }

    pub fn finish(&mut self) {
        self.write_line(1, "Finished importing Blogger");
    }

    pub fn migrated(&mut self, entry: &Entry, comments: i64) {
        self.write_line(1, &format!("Migrated {entry} + {comments} comments"));
    }

    pub fn skipped(&mut self, entry: &Entry) {
        self.write_line(1, &format!("Skipped {entry} (already migrated)"));
    }

    pub fn failed(&mut self, post_title: &str, reason: &str) {
        self.write_line(1, &format!("Failed {post_title}: {reason}"));
    }

    /// Comment detail for one post, shown at verbosity 2 and above.
    pub fn comment_detail(&mut self, created: usize, existing: usize) {
        self.write_line(
            2,
            &format!("  {created} comments imported, {existing} already present"),
        );
    }

    pub fn comments_unavailable(&mut self, reason: &str) {
        self.write_line(2, &format!("  comments unavailable: {reason}"));
    }
}
