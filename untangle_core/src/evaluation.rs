use std::path::Path;

use untangle_api::{Diff, GroundTruthRow, ScoreRow, ToolGroupAssignment};

use crate::align::LineAligner;
use crate::clean::DiffCleaner;
use crate::config::EvaluationConfig;
use crate::normalize::normalize;
use crate::score::score;
use crate::truth::{read_diff, read_ground_truth, read_tool_assignments};
use crate::Result;

/// The original diff of a commit together with its two decompositions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDiffs {
    /// Tangled version-control diff.
    pub original: Diff,
    /// Bug-fixing changes only.
    pub fix: Diff,
    /// Non-bug-fixing changes only.
    pub nonfix: Diff,
}

impl CommitDiffs {
    /// Read the three diffs from disk.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingInput`] or [`crate::Error::Parse`] for
    /// the first diff that cannot be loaded.
    pub fn read(original: &Path, fix: &Path, nonfix: &Path) -> Result<Self> {
        Ok(Self {
            original: read_diff(original)?,
            fix: read_diff(fix)?,
            nonfix: read_diff(nonfix)?,
        })
    }

    /// Clean all three diffs with the same cleaner.
    #[must_use]
    pub fn cleaned(&self, cleaner: &DiffCleaner) -> Self {
        Self {
            original: cleaner.clean(&self.original),
            fix: cleaner.clean(&self.fix),
            nonfix: cleaner.clean(&self.nonfix),
        }
    }

    /// Ground-truth rows for the original diff.
    #[must_use]
    pub fn ground_truth(&self) -> Vec<GroundTruthRow> {
        LineAligner::new().classify(&self.original, &self.fix, &self.nonfix)
    }
}

/// Score every tool decomposition stored in `eval_dir` against its ground truth.
///
/// A tool whose decomposition file is missing is scored as if it had put
/// every line in the `"o"` group.
///
/// # Errors
///
/// Returns [`crate::Error::MissingInput`] when the ground truth is absent and
/// [`crate::Error::Csv`] for malformed CSV files.
pub fn evaluate_commit(
    eval_dir: &Path,
    project: &str,
    bug_id: &str,
    config: &EvaluationConfig,
) -> Result<ScoreRow> {
    let truth = read_ground_truth(&eval_dir.join(&config.truth_file))?;
    let score_tool = |file_name: &str| -> Result<f64> {
        let tool = read_tool_assignments(&eval_dir.join(file_name))?;
        Ok(score(&truth, tool.as_deref()))
    };

    let row = ScoreRow {
        project: project.to_string(),
        bug_id: bug_id.to_string(),
        smartcommit_score: score_tool(&config.smartcommit_file)?,
        flexeme_score: score_tool(&config.flexeme_file)?,
        file_untangling_score: score_tool(&config.file_untangling_file)?,
    };
    tracing::info!(
        project,
        bug_id,
        smartcommit = row.smartcommit_score,
        flexeme = row.flexeme_score,
        file_untangling = row.file_untangling_score,
        "scored commit"
    );
    Ok(row)
}

/// Normalize a stored tool decomposition onto the ground-truth lines.
///
/// # Errors
///
/// Returns [`crate::Error::MissingInput`] when the ground truth is absent and
/// [`crate::Error::Csv`] for malformed CSV files.
pub fn normalize_files(truth: &Path, tool: &Path) -> Result<Vec<ToolGroupAssignment>> {
    let truth = read_ground_truth(truth)?;
    let tool = read_tool_assignments(tool)?;
    Ok(normalize(&truth, tool.as_deref()))
}
