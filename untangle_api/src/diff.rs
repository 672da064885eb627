use std::fmt;

use serde::{Deserialize, Serialize};

/// Path used by unified diffs for the missing side of an added or deleted file.
pub const NULL_PATH: &str = "/dev/null";

/// A parsed unified diff: an ordered list of file patches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diff {
    /// File-level patches in the order they appear in the diff text.
    #[serde(default)]
    pub files: Vec<FilePatch>,
}

impl Diff {
    /// Iterate over every changed (non-context) line together with its file patch.
    pub fn changed_lines(&self) -> impl Iterator<Item = (&FilePatch, &DiffLine)> + '_ {
        self.files.iter().flat_map(|file| {
            file.hunks
                .iter()
                .flat_map(|hunk| hunk.lines.iter())
                .filter(|line| line.is_change())
                .map(move |line| (file, line))
        })
    }

    /// Number of changed (non-context) lines across all files.
    #[must_use]
    pub fn changed_line_count(&self) -> usize {
        self.changed_lines().count()
    }
}

/// Representation of the patch for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatch {
    /// Path from the `---` header, including any `a/` prefix.
    pub source_path: String,
    /// Path from the `+++` header, including any `b/` prefix.
    pub target_path: String,
    /// The hunks that make up this file patch.
    #[serde(default)]
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// Construct an empty file patch for the given header paths.
    pub fn new(source_path: impl Into<String>, target_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: target_path.into(),
            hunks: Vec::new(),
        }
    }

    /// Logical path of the file, without the `a/`/`b/` prefixes.
    ///
    /// For added or deleted files the side that is not `/dev/null` is used;
    /// otherwise the source side names the file.
    #[must_use]
    pub fn path(&self) -> &str {
        let source = self.source_path.as_str();
        let target = self.target_path.as_str();
        match (source.strip_prefix("a/"), target.strip_prefix("b/")) {
            (Some(stripped), Some(_)) => stripped,
            (Some(stripped), None) if target == NULL_PATH => stripped,
            (None, Some(stripped)) if source == NULL_PATH => stripped,
            _ => source,
        }
    }

    /// Whether the file only exists on the target side.
    #[must_use]
    pub fn is_added_file(&self) -> bool {
        self.source_path == NULL_PATH
    }

    /// Whether the file only exists on the source side.
    #[must_use]
    pub fn is_removed_file(&self) -> bool {
        self.target_path == NULL_PATH
    }

    /// Whether either side of the patch carries one of the given extensions.
    ///
    /// Extensions are compared case-insensitively and without the leading dot.
    #[must_use]
    pub fn has_extension(&self, extensions: &[String]) -> bool {
        [self.source_path.as_str(), self.target_path.as_str()]
            .iter()
            .any(|path| {
                let lower = path.to_ascii_lowercase();
                extensions.iter().any(|extension| {
                    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
                    lower.ends_with(&format!(".{extension}"))
                })
            })
    }

    /// Summary of additions and deletions across all hunks.
    #[must_use]
    pub fn stats(&self) -> DiffStats {
        self.hunks
            .iter()
            .flat_map(|hunk| hunk.lines.iter())
            .fold(DiffStats::ZERO, |stats, line| match line.kind {
                LineKind::Added => stats.add(DiffStats::new(1, 0)),
                LineKind::Removed => stats.add(DiffStats::new(0, 1)),
                LineKind::Context => stats,
            })
    }
}

/// Summary information about the changes within a file patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiffStats {
    /// Number of added lines.
    pub additions: u32,
    /// Number of removed lines.
    pub deletions: u32,
}

impl DiffStats {
    /// A stats instance with zero additions and deletions.
    pub const ZERO: Self = Self {
        additions: 0,
        deletions: 0,
    };

    /// Convenience constructor for explicit values.
    #[must_use]
    pub const fn new(additions: u32, deletions: u32) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    /// Combine two stats structs.
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self {
            additions: self.additions + other.additions,
            deletions: self.deletions + other.deletions,
        }
    }
}

/// A contiguous block of lines introduced by an `@@` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Range metadata from the hunk header.
    pub header: HunkHeader,
    /// Lines of the hunk, context included.
    #[serde(default)]
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Number of lines that exist in the pre-image (removed or context).
    #[must_use]
    pub fn source_line_count(&self) -> u32 {
        count_u32(self.lines.iter().filter(|line| line.kind != LineKind::Added))
    }

    /// Number of lines that exist in the post-image (added or context).
    #[must_use]
    pub fn target_line_count(&self) -> u32 {
        count_u32(self.lines.iter().filter(|line| line.kind != LineKind::Removed))
    }

    /// Whether the hunk still contains at least one added or removed line.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(DiffLine::is_change)
    }

    /// Source and target lengths written in the rendered header.
    ///
    /// A demoted line is written on its original side only, so it is taken
    /// back out of the count for the side it never existed on.
    #[must_use]
    pub fn rendered_lengths(&self) -> (u32, u32) {
        let demoted = |kind| {
            count_u32(
                self.lines
                    .iter()
                    .filter(|line| line.demoted_from() == Some(kind)),
            )
        };
        (
            self.header.source_length.saturating_sub(demoted(LineKind::Added)),
            self.header.target_length.saturating_sub(demoted(LineKind::Removed)),
        )
    }
}

fn count_u32<I: Iterator>(iter: I) -> u32 {
    u32::try_from(iter.count()).unwrap_or(u32::MAX)
}

/// The line ranges and section text of a hunk header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkHeader {
    /// First line of the hunk in the pre-image.
    pub source_start: u32,
    /// Number of pre-image lines (removed + context) covered by the hunk.
    pub source_length: u32,
    /// First line of the hunk in the post-image.
    pub target_start: u32,
    /// Number of post-image lines (added + context) covered by the hunk.
    pub target_length: u32,
    /// Optional section header (e.g., enclosing method signature).
    #[serde(default)]
    pub section: Option<String>,
}

/// A single line within a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// The role the line plays in the diff.
    pub kind: LineKind,
    /// Raw text of the line without the diff marker, line ending included.
    pub value: String,
    /// 1-based pre-image line number, set for removed and context lines.
    #[serde(default)]
    pub source_line_no: Option<u32>,
    /// 1-based post-image line number, set for added and context lines.
    #[serde(default)]
    pub target_line_no: Option<u32>,
}

impl DiffLine {
    /// An added line at the given post-image position.
    pub fn added(target_line_no: u32, value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Added,
            value: value.into(),
            source_line_no: None,
            target_line_no: Some(target_line_no),
        }
    }

    /// A removed line at the given pre-image position.
    pub fn removed(source_line_no: u32, value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Removed,
            value: value.into(),
            source_line_no: Some(source_line_no),
            target_line_no: None,
        }
    }

    /// An unchanged line present on both sides.
    pub fn context(source_line_no: u32, target_line_no: u32, value: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Context,
            value: value.into(),
            source_line_no: Some(source_line_no),
            target_line_no: Some(target_line_no),
        }
    }

    /// Whether the line is an addition or a removal.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Context
    }

    /// The change kind a context line had before cleaning demoted it.
    ///
    /// Demoted lines keep the number of their own side only.
    #[must_use]
    pub const fn demoted_from(&self) -> Option<LineKind> {
        match (self.kind, self.source_line_no, self.target_line_no) {
            (LineKind::Context, None, Some(_)) => Some(LineKind::Added),
            (LineKind::Context, Some(_), None) => Some(LineKind::Removed),
            _ => None,
        }
    }
}

impl fmt::Display for DiffLine {
    // A demoted line is written as a blank change on its original side so a
    // reparse numbers every other line as before.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.demoted_from() {
            Some(kind) => writeln!(f, "{}", kind.marker()),
            None => write!(f, "{}{}", self.kind.marker(), self.value),
        }
    }
}

/// Type of a line contained in a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Unchanged context line.
    Context,
    /// A line added to the post-image.
    Added,
    /// A line removed from the pre-image.
    Removed,
}

impl LineKind {
    /// The unified-diff marker character for the kind.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Context => ' ',
            Self::Added => '+',
            Self::Removed => '-',
        }
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            writeln!(f, "--- {}", file.source_path)?;
            writeln!(f, "+++ {}", file.target_path)?;
            for hunk in &file.hunks {
                let header = &hunk.header;
                let (source_length, target_length) = hunk.rendered_lengths();
                write!(
                    f,
                    "@@ -{},{source_length} +{},{target_length} @@",
                    header.source_start, header.target_start,
                )?;
                match &header.section {
                    Some(section) => writeln!(f, " {section}")?,
                    None => writeln!(f)?,
                }
                for line in &hunk.lines {
                    write!(f, "{line}")?;
                    if line.demoted_from().is_none() && !line.value.ends_with('\n') {
                        writeln!(f)?;
                    }
                }
            }
        }
        Ok(())
    }
}
