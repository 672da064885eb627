//! Projection of a tool decomposition onto the ground-truth lines.

use std::collections::HashMap;

use untangle_api::{GroundTruthRow, LineKey, ToolGroupAssignment, OTHER_GROUP};

/// Join a tool decomposition onto the ground-truth line set.
///
/// The result has exactly one assignment per truth row, in truth order.
/// Truth lines the tool did not label get the sentinel group `"o"`; tool
/// lines outside the truth are dropped. When the tool labels a line more
/// than once, its first assignment wins. A missing decomposition (`None`)
/// labels every line `"o"`.
#[must_use]
pub fn normalize(
    truth: &[GroundTruthRow],
    tool: Option<&[ToolGroupAssignment]>,
) -> Vec<ToolGroupAssignment> {
    let mut groups: HashMap<LineKey, &str> = HashMap::new();
    for assignment in tool.unwrap_or_default() {
        groups
            .entry(assignment.key())
            .or_insert(assignment.group.as_str());
    }

    let mut unlabeled = 0_usize;
    let normalized: Vec<_> = truth
        .iter()
        .map(|row| {
            let key = row.key();
            let group = groups.get(&key).copied().unwrap_or_else(|| {
                unlabeled += 1;
                OTHER_GROUP
            });
            ToolGroupAssignment::new(key, group)
        })
        .collect();

    tracing::debug!(
        truth = truth.len(),
        tool = ?tool.map(<[_]>::len),
        unlabeled,
        "normalized tool decomposition"
    );
    normalized
}

#[cfg(test)]
mod tests {
    use untangle_api::Group;

    use super::*;

    fn truth_row(target: u32, group: Group) -> GroundTruthRow {
        GroundTruthRow::new(LineKey::new("A.java", None, Some(target)), group)
    }

    fn tool_row(target: u32, group: &str) -> ToolGroupAssignment {
        ToolGroupAssignment::new(LineKey::new("A.java", None, Some(target)), group)
    }

    #[test]
    fn fills_missing_and_drops_extra_lines() {
        let truth = vec![truth_row(1, Group::Fix), truth_row(2, Group::Other)];
        let tool = vec![tool_row(2, "g1"), tool_row(9, "g2"), tool_row(2, "g3")];

        let normalized = normalize(&truth, Some(tool.as_slice()));
        let groups: Vec<_> = normalized.iter().map(|row| row.group.as_str()).collect();
        assert_eq!(groups, vec!["o", "g1"]);
        assert_eq!(normalized[1].key(), truth[1].key());
    }

    #[test]
    fn tangled_rows_receive_one_assignment_each() {
        let truth = vec![truth_row(1, Group::Fix), truth_row(1, Group::Other)];
        let tool = vec![tool_row(1, "0")];

        let normalized = normalize(&truth, Some(tool.as_slice()));
        assert_eq!(normalized.len(), 2);
        assert!(normalized.iter().all(|row| row.group == "0"));
    }

    #[test]
    fn missing_decomposition_is_all_other() {
        let truth = vec![truth_row(1, Group::Fix), truth_row(2, Group::Other)];
        let normalized = normalize(&truth, None);
        assert!(normalized.iter().all(ToolGroupAssignment::is_other));
    }
}
