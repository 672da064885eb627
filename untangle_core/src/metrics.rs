use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use untangle_api::{Diff, DiffLine, Group, GroundTruthRow};

use crate::align::LineSignature;
use crate::clean::is_test_file;
use crate::evaluation::CommitDiffs;
use crate::{Error, Result};

/// Descriptive statistics of one commit's diffs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffMetrics {
    /// Project the commit belongs to.
    pub project: String,
    /// Bug identifier within the project.
    pub bug_id: String,
    /// Files with at least one changed line after cleaning.
    pub files_updated: usize,
    /// Test files touched by the raw diff.
    pub test_files_updated: usize,
    /// Hunks with at least one non-blank changed line after cleaning.
    pub hunks: usize,
    /// Code changed lines per hunk; absent without hunks.
    pub average_hunk_size: Option<f64>,
    /// Non-blank changed lines after cleaning.
    pub code_changed_lines: usize,
    /// Raw changed lines removed by cleaning.
    pub noncode_changed_lines: usize,
    /// Lines that belong to both the fix and the non-fix diff.
    pub tangled_lines: usize,
    /// Hunks mixing fix and non-fix lines.
    pub tangled_hunks: usize,
}

impl DiffMetrics {
    /// Compute the metrics from the raw original diff and the cleaned diffs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParityViolation`] when the fix and non-fix line
    /// counts exceed the original count by an odd number.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        project: impl Into<String>,
        bug_id: impl Into<String>,
        raw_original: &Diff,
        cleaned: &CommitDiffs,
    ) -> Result<Self> {
        let original = &cleaned.original;
        let hunks = code_hunks(original);
        let code_changed_lines = code_lines(original).count();
        let raw_changed_lines = raw_original.changed_line_count();

        Ok(Self {
            project: project.into(),
            bug_id: bug_id.into(),
            files_updated: original
                .files
                .iter()
                .filter(|file| file.hunks.iter().any(|hunk| hunk.has_changes()))
                .count(),
            test_files_updated: raw_original
                .files
                .iter()
                .filter(|file| is_test_file(file.path()))
                .count(),
            hunks: hunks.len(),
            average_hunk_size: (!hunks.is_empty())
                .then(|| code_changed_lines as f64 / hunks.len() as f64),
            code_changed_lines,
            noncode_changed_lines: raw_changed_lines.saturating_sub(code_changed_lines),
            tangled_lines: count_tangled_lines(cleaned)?,
            tangled_hunks: count_tangled_hunks(original, &cleaned.fix),
        })
    }
}

/// Number of lines shared by the fix and non-fix diffs.
///
/// Every tangled line shows up once in each decomposition, so
/// `fix + nonfix - original` counts it twice.
///
/// # Errors
///
/// Returns [`Error::ParityViolation`] when that difference is odd.
pub fn count_tangled_lines(diffs: &CommitDiffs) -> Result<usize> {
    let total = code_lines(&diffs.original).count();
    let fix = code_lines(&diffs.fix).count();
    let nonfix = code_lines(&diffs.nonfix).count();

    let surplus = i64::try_from(fix + nonfix).unwrap_or(i64::MAX)
        - i64::try_from(total).unwrap_or(i64::MAX);
    if surplus.rem_euclid(2) != 0 {
        return Err(Error::ParityViolation { fix, nonfix, total });
    }
    Ok(usize::try_from(surplus / 2).unwrap_or(0))
}

/// Number of original hunks holding some, but not all, lines of the fix diff.
#[must_use]
pub fn count_tangled_hunks(original: &Diff, fix: &Diff) -> usize {
    let fix_lines: HashSet<LineSignature> = code_lines(fix).map(LineSignature::of).collect();
    code_hunks(original)
        .into_iter()
        .filter(|lines| {
            let fixing = lines
                .iter()
                .filter(|line| fix_lines.contains(&LineSignature::of(line)))
                .count();
            fixing > 0 && fixing < lines.len()
        })
        .count()
}

fn is_code_line(line: &DiffLine) -> bool {
    line.is_change() && !line.value.trim().is_empty()
}

fn code_lines(diff: &Diff) -> impl Iterator<Item = &DiffLine> + '_ {
    diff.changed_lines()
        .map(|(_, line)| line)
        .filter(|line| !line.value.trim().is_empty())
}

fn code_hunks(diff: &Diff) -> Vec<Vec<&DiffLine>> {
    diff.files
        .iter()
        .flat_map(|file| file.hunks.iter())
        .map(|hunk| hunk.lines.iter().filter(|line| is_code_line(line)).collect::<Vec<_>>())
        .filter(|lines| !lines.is_empty())
        .collect()
}

/// Statistics of a ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruthMetrics {
    /// Project the commit belongs to.
    pub project: String,
    /// Bug identifier within the project.
    pub bug_id: String,
    /// Rows labeled `fix`.
    pub fix_lines: usize,
    /// Rows labeled `other`.
    pub other_lines: usize,
    /// Files containing more than one group.
    pub tangled_files: usize,
    /// Whether the commit mixes both groups.
    pub is_tangled: bool,
}

impl TruthMetrics {
    /// Summarize ground-truth rows.
    #[must_use]
    pub fn compute(
        project: impl Into<String>,
        bug_id: impl Into<String>,
        rows: &[GroundTruthRow],
    ) -> Self {
        let mut per_file: BTreeMap<&str, BTreeSet<Group>> = BTreeMap::new();
        for row in rows {
            per_file.entry(row.file.as_str()).or_default().insert(row.group);
        }
        let groups: BTreeSet<Group> = rows.iter().map(|row| row.group).collect();

        Self {
            project: project.into(),
            bug_id: bug_id.into(),
            fix_lines: rows.iter().filter(|row| row.group == Group::Fix).count(),
            other_lines: rows.iter().filter(|row| row.group == Group::Other).count(),
            tangled_files: per_file.values().filter(|groups| groups.len() > 1).count(),
            is_tangled: groups.len() > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use untangle_api::{FilePatch, Hunk, HunkHeader, LineKey};

    use super::*;

    fn diff(hunks: Vec<Vec<DiffLine>>) -> Diff {
        let mut file = FilePatch::new("a/src/A.java", "b/src/A.java");
        for lines in hunks {
            file.hunks.push(Hunk {
                header: HunkHeader {
                    source_start: 1,
                    source_length: 0,
                    target_start: 1,
                    target_length: 0,
                    section: None,
                },
                lines,
            });
        }
        Diff { files: vec![file] }
    }

    #[test]
    fn tangled_lines_count_shared_lines() {
        let diffs = CommitDiffs {
            original: diff(vec![vec![
                DiffLine::removed(1, "a = 3;\n"),
                DiffLine::added(1, "b = 4;\n"),
            ]]),
            fix: diff(vec![vec![
                DiffLine::removed(1, "b = 3;\n"),
                DiffLine::added(1, "b = 4;\n"),
            ]]),
            nonfix: diff(vec![vec![
                DiffLine::removed(1, "a = 3;\n"),
                DiffLine::added(1, "b = 3;\n"),
            ]]),
        };
        assert_eq!(count_tangled_lines(&diffs).expect("even surplus"), 1);
    }

    #[test]
    fn odd_surplus_is_parity_violation() {
        let diffs = CommitDiffs {
            original: diff(vec![vec![DiffLine::added(1, "x\n")]]),
            fix: diff(vec![vec![DiffLine::added(1, "x\n"), DiffLine::added(2, "y\n")]]),
            nonfix: Diff::default(),
        };
        let err = count_tangled_lines(&diffs).expect_err("odd surplus");
        assert!(matches!(
            err,
            Error::ParityViolation {
                fix: 2,
                nonfix: 0,
                total: 1
            }
        ));
    }

    #[test]
    fn tangled_lines_are_clamped_at_zero() {
        let diffs = CommitDiffs {
            original: diff(vec![vec![DiffLine::added(1, "x\n"), DiffLine::added(2, "y\n")]]),
            fix: Diff::default(),
            nonfix: Diff::default(),
        };
        assert_eq!(count_tangled_lines(&diffs).expect("even surplus"), 0);
    }

    #[test]
    fn diff_metrics_summarize_cleaned_and_raw_diffs() {
        let raw = diff(vec![
            vec![
                DiffLine::added(1, "// note\n"),
                DiffLine::added(2, "fix();\n"),
                DiffLine::added(3, "tidy();\n"),
            ],
            vec![DiffLine::added(10, "other();\n")],
        ]);
        let cleaned = CommitDiffs {
            original: diff(vec![
                vec![
                    DiffLine::context(1, 1, "// note\n"),
                    DiffLine::added(2, "fix();\n"),
                    DiffLine::added(3, "tidy();\n"),
                ],
                vec![DiffLine::added(10, "other();\n")],
            ]),
            fix: diff(vec![vec![DiffLine::added(2, "fix();\n")]]),
            nonfix: diff(vec![
                vec![DiffLine::added(2, "tidy();\n")],
                vec![DiffLine::added(9, "other();\n")],
            ]),
        };

        let metrics = DiffMetrics::compute("Lang", "1", &raw, &cleaned).expect("metrics");
        assert_eq!(metrics.files_updated, 1);
        assert_eq!(metrics.test_files_updated, 0);
        assert_eq!(metrics.hunks, 2);
        assert_eq!(metrics.code_changed_lines, 3);
        assert_eq!(metrics.average_hunk_size, Some(1.5));
        assert_eq!(metrics.noncode_changed_lines, 1);
        assert_eq!(metrics.tangled_lines, 0);
        assert_eq!(metrics.tangled_hunks, 1);
    }

    #[test]
    fn truth_metrics_detect_tangled_files() {
        let rows = vec![
            GroundTruthRow::new(LineKey::new("A.java", Some(1), None), Group::Fix),
            GroundTruthRow::new(LineKey::new("A.java", None, Some(1)), Group::Other),
            GroundTruthRow::new(LineKey::new("B.java", None, Some(4)), Group::Other),
        ];
        let metrics = TruthMetrics::compute("Lang", "1", &rows);
        assert_eq!(metrics.fix_lines, 1);
        assert_eq!(metrics.other_lines, 2);
        assert_eq!(metrics.tangled_files, 1);
        assert!(metrics.is_tangled);
    }
}
