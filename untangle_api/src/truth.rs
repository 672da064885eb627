use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel tool group for lines a tool left unlabeled or that only carry
/// non-bug-fixing changes.
pub const OTHER_GROUP: &str = "o";

/// Ground-truth concern a changed line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Part of the bug fix.
    Fix,
    /// Part of an unrelated change.
    Other,
}

impl Group {
    /// Label as written in ground-truth CSV files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fix => "fix",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a changed line across ground truth and tool output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    /// Logical file path.
    pub file: String,
    /// Pre-image line number for removed lines.
    pub source: Option<u32>,
    /// Post-image line number for added lines.
    pub target: Option<u32>,
}

impl LineKey {
    /// Construct a key from its parts.
    pub fn new(file: impl Into<String>, source: Option<u32>, target: Option<u32>) -> Self {
        Self {
            file: file.into(),
            source,
            target,
        }
    }
}

/// One row of a ground-truth CSV. Tangled lines appear twice, once per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundTruthRow {
    /// Logical file path.
    pub file: String,
    /// Pre-image line number for removed lines.
    pub source: Option<u32>,
    /// Post-image line number for added lines.
    pub target: Option<u32>,
    /// Concern the line belongs to.
    pub group: Group,
}

impl GroundTruthRow {
    /// Build a row for the line identified by `key`.
    #[must_use]
    pub fn new(key: LineKey, group: Group) -> Self {
        Self {
            file: key.file,
            source: key.source,
            target: key.target,
            group,
        }
    }

    /// The line this row labels.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.file.clone(), self.source, self.target)
    }
}

/// One row of a tool decomposition CSV; the group label is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolGroupAssignment {
    /// Logical file path.
    pub file: String,
    /// Pre-image line number for removed lines.
    pub source: Option<u32>,
    /// Post-image line number for added lines.
    pub target: Option<u32>,
    /// Tool-defined group label.
    pub group: String,
}

impl ToolGroupAssignment {
    /// Build an assignment for the line identified by `key`.
    pub fn new(key: LineKey, group: impl Into<String>) -> Self {
        Self {
            file: key.file,
            source: key.source,
            target: key.target,
            group: group.into(),
        }
    }

    /// The line this assignment labels.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.file.clone(), self.source, self.target)
    }

    /// Whether the line was left to the sentinel group.
    #[must_use]
    pub fn is_other(&self) -> bool {
        self.group == OTHER_GROUP
    }
}

/// Per-commit scores of every evaluated tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// Project the commit belongs to.
    pub project: String,
    /// Bug identifier within the project.
    pub bug_id: String,
    /// Rand Index of the SmartCommit decomposition.
    pub smartcommit_score: f64,
    /// Rand Index of the Flexeme decomposition.
    pub flexeme_score: f64,
    /// Rand Index of the file-based baseline decomposition.
    pub file_untangling_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_labels_match_csv_values() {
        assert_eq!(Group::Fix.to_string(), "fix");
        assert_eq!(Group::Other.as_str(), "other");
        let parsed: Group = serde_json::from_str("\"other\"").expect("parse group");
        assert_eq!(parsed, Group::Other);
    }

    #[test]
    fn rows_share_keys_for_tangled_lines() {
        let key = LineKey::new("src/A.java", None, Some(12));
        let fix = GroundTruthRow::new(key.clone(), Group::Fix);
        let other = GroundTruthRow::new(key.clone(), Group::Other);
        assert_eq!(fix.key(), other.key());
        assert_ne!(fix, other);

        let assignment = ToolGroupAssignment::new(key, OTHER_GROUP);
        assert!(assignment.is_other());
        assert_eq!(assignment.key(), fix.key());
    }
}
