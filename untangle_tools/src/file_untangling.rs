use std::collections::HashMap;

use untangle_api::ToolGroupAssignment;
use untangle_tool_api::{DecompositionRequest, ToolAdapter, ToolResult};

/// Naive baseline: every changed file is its own group.
///
/// Groups are numbered `0, 1, 2, ...` in order of each file's first
/// appearance in the ground truth; the raw result path is not consulted.
#[derive(Debug, Default)]
pub struct FileUntanglingTool;

impl ToolAdapter for FileUntanglingTool {
    fn id(&self) -> &'static str {
        "file_untangling"
    }

    fn label(&self) -> &'static str {
        "File-based untangling"
    }

    fn output_file(&self) -> &'static str {
        "file_untangling.csv"
    }

    fn decompose(&self, request: &DecompositionRequest<'_>) -> ToolResult<Vec<ToolGroupAssignment>> {
        let mut groups: HashMap<&str, usize> = HashMap::new();
        Ok(request
            .truth
            .iter()
            .map(|row| {
                let next = groups.len();
                let group = *groups.entry(row.file.as_str()).or_insert(next);
                ToolGroupAssignment::new(row.key(), group.to_string())
            })
            .collect())
    }
}
