//! Diff cleaning: demote non-code and self-cancelling edits to context lines
//! and repair hunk headers so they describe the remaining bodies.
//!
//! Lines are never removed, only reclassified, so every hunk keeps its shape
//! and line numbering.

use untangle_api::{Diff, DiffLine, FilePatch, Hunk, LineKind};

use crate::config::CleaningConfig;

const COMMENT_MARKERS: [&str; 4] = ["/*", "*/", "//", "*"];

/// Applies the configured cleaning steps to parsed diffs.
#[derive(Debug, Clone, Default)]
pub struct DiffCleaner {
    config: CleaningConfig,
}

impl DiffCleaner {
    /// Create a cleaner with the given switches.
    #[must_use]
    pub const fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Return a cleaned copy of `diff`. The input is left untouched.
    #[must_use]
    pub fn clean(&self, diff: &Diff) -> Diff {
        let files = diff
            .files
            .iter()
            .filter(|file| self.keeps_file(file))
            .map(|file| {
                let mut file = file.clone();
                for hunk in &mut file.hunks {
                    self.clean_hunk(hunk);
                }
                file
            })
            .collect();
        Diff { files }
    }

    /// Run every enabled step on one hunk.
    pub fn clean_hunk(&self, hunk: &mut Hunk) {
        self.suppress_non_code_lines(hunk);
        if self.config.cancel_redundant_pairs {
            cancel_redundant_pairs(hunk);
        }
        repair_hunk_header(hunk);
    }

    /// Demote changed comment, import and blank lines to context.
    pub fn suppress_non_code_lines(&self, hunk: &mut Hunk) {
        for line in hunk.lines.iter_mut().filter(|line| line.is_change()) {
            if self.is_non_code(line) {
                demote(line);
            }
        }
    }

    fn is_non_code(&self, line: &DiffLine) -> bool {
        let text = line.value.trim();
        (self.config.strip_blank_lines && text.is_empty())
            || (self.config.strip_comments && is_comment(text))
            || (self.config.strip_imports && is_import(text))
    }

    fn keeps_file(&self, file: &FilePatch) -> bool {
        if !self.config.extensions.is_empty() && !file.has_extension(&self.config.extensions) {
            tracing::debug!(path = file.path(), "dropping file outside extension filter");
            return false;
        }
        if self.config.exclude_tests && is_test_file(file.path()) {
            tracing::debug!(path = file.path(), "dropping test file");
            return false;
        }
        true
    }
}

/// Demote adjacent added/removed pairs whose trimmed text is equal.
///
/// A cancelled pair is skipped as a whole; its second line is not compared
/// with the line after it.
pub fn cancel_redundant_pairs(hunk: &mut Hunk) {
    let lines = &mut hunk.lines;
    let mut i = 0;
    while i + 1 < lines.len() {
        let (current, next) = (&lines[i], &lines[i + 1]);
        let cancels = current.is_change()
            && next.is_change()
            && current.kind != next.kind
            && current.value.trim() == next.value.trim();
        if cancels {
            demote(&mut lines[i]);
            demote(&mut lines[i + 1]);
            i += 2;
        } else {
            i += 1;
        }
    }
}

/// Recompute header lengths from the line kinds in the body.
pub fn repair_hunk_header(hunk: &mut Hunk) {
    hunk.header.source_length = hunk.source_line_count();
    hunk.header.target_length = hunk.target_line_count();
}

/// Whether `path` names a test source file.
#[must_use]
pub fn is_test_file(path: &str) -> bool {
    path.contains("/test/")
        || path.contains("/tests/")
        || path.starts_with("test/")
        || path.starts_with("tests/")
        || path.ends_with("Test.java")
}

fn is_comment(text: &str) -> bool {
    COMMENT_MARKERS.iter().any(|marker| text.starts_with(marker))
}

fn is_import(text: &str) -> bool {
    text.strip_prefix("import")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

// A demoted line keeps the number of its own side only. The renderer relies
// on that to write it back as a blank change on the same side.
fn demote(line: &mut DiffLine) {
    line.kind = LineKind::Context;
}
