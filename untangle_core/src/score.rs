//! Scoring of tool decompositions with the Rand Index.
//!
//! Tool groups holding no bug-fixing line are merged into the `"o"` group
//! before the comparison, so a tool is not penalized for how it splits the
//! unrelated changes.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use untangle_api::{Group, GroundTruthRow, ToolGroupAssignment, OTHER_GROUP};

use crate::normalize::normalize;

/// Rand Index of a tool decomposition against the ground truth, in `[0, 1]`.
///
/// The decomposition is first normalized onto the truth lines and its
/// purely non-bug-fixing groups are collapsed into `"o"`.
#[must_use]
pub fn score(truth: &[GroundTruthRow], tool: Option<&[ToolGroupAssignment]>) -> f64 {
    let normalized = normalize(truth, tool);
    let truth_labels: Vec<Group> = truth.iter().map(|row| row.group).collect();
    let tool_labels = merge_nonbugfixing_changes(&truth_labels, &normalized);
    rand_index(&truth_labels, &tool_labels)
}

/// Tool group per line, with every group that holds no `fix` line renamed
/// to `"o"`.
///
/// `truth` and `tool` are parallel: entry `i` of both describes the same line.
#[must_use]
pub fn merge_nonbugfixing_changes(
    truth: &[Group],
    tool: &[ToolGroupAssignment],
) -> Vec<String> {
    let fixing: HashSet<&str> = truth
        .iter()
        .zip(tool)
        .filter(|(group, _)| **group == Group::Fix)
        .map(|(_, assignment)| assignment.group.as_str())
        .collect();

    tool.iter()
        .map(|assignment| {
            if fixing.contains(assignment.group.as_str()) {
                assignment.group.clone()
            } else {
                OTHER_GROUP.to_string()
            }
        })
        .collect()
}

/// Fraction of item pairs on which two labelings agree about being in the
/// same cluster or in different clusters.
///
/// Labels are paired by position. Fewer than two items score `1.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rand_index<A, B>(truth: &[A], tool: &[B]) -> f64
where
    A: Eq + Hash,
    B: Eq + Hash,
{
    let items = truth.len().min(tool.len()) as u64;
    if items < 2 {
        return 1.0;
    }

    let mut contingency: HashMap<(&A, &B), u64> = HashMap::new();
    let mut truth_sizes: HashMap<&A, u64> = HashMap::new();
    let mut tool_sizes: HashMap<&B, u64> = HashMap::new();
    for (a, b) in truth.iter().zip(tool) {
        *contingency.entry((a, b)).or_default() += 1;
        *truth_sizes.entry(a).or_default() += 1;
        *tool_sizes.entry(b).or_default() += 1;
    }

    let same_both = sum_pairs(contingency.values());
    let same_truth = sum_pairs(truth_sizes.values());
    let same_tool = sum_pairs(tool_sizes.values());

    let total = pairs(items);
    let different_both = total + same_both - same_truth - same_tool;
    (same_both + different_both) as f64 / total as f64
}

fn sum_pairs<'a>(sizes: impl Iterator<Item = &'a u64>) -> u64 {
    sizes.map(|size| pairs(*size)).sum()
}

const fn pairs(n: u64) -> u64 {
    n * n.saturating_sub(1) / 2
}
