use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use untangle_api::{Diff, LineKey, ToolGroupAssignment};
use untangle_tool_api::{DecompositionRequest, ToolAdapter, ToolError, ToolResult};

const DIFFS_DIR: &str = "diffs";
const GROUPS_DIR: &str = "generated_groups";

/// Adapter for SmartCommit's JSON results.
///
/// The result directory holds one JSON document per changed file under
/// `diffs/` and one per group under `generated_groups/`. Groups reference
/// hunks as `fileID:hunkID`.
#[derive(Debug, Default)]
pub struct SmartCommitTool;

impl ToolAdapter for SmartCommitTool {
    fn id(&self) -> &'static str {
        "smartcommit"
    }

    fn label(&self) -> &'static str {
        "SmartCommit"
    }

    fn output_file(&self) -> &'static str {
        "smartcommit.csv"
    }

    fn decompose(&self, request: &DecompositionRequest<'_>) -> ToolResult<Vec<ToolGroupAssignment>> {
        let files = read_diff_files(&request.result_path.join(DIFFS_DIR))?;
        let groups_dir = request.result_path.join(GROUPS_DIR);

        let mut rows = Vec::new();
        for path in list_json_files(&groups_dir)? {
            let group: GroupRecord = read_json(&path)?;
            for reference in &group.diff_hunk_ids {
                let diff = build_hunk_diff(&files, reference)
                    .ok_or_else(|| {
                        ToolError::malformed(&path, format!("unknown hunk reference `{reference}`"))
                    })?
                    .map_err(|err| ToolError::malformed(&path, err.to_string()))?;
                rows.extend(diff.changed_lines().map(|(file, line)| {
                    let key = LineKey::new(file.path(), line.source_line_no, line.target_line_no);
                    ToolGroupAssignment::new(key, group.group_id.clone())
                }));
            }
        }
        tracing::debug!(
            path = %request.result_path.display(),
            rows = rows.len(),
            "parsed smartcommit groups"
        );
        Ok(rows)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiffFileRecord {
    #[serde(rename = "fileID")]
    file_id: String,
    #[serde(default)]
    current_relative_path: String,
    raw_headers: Vec<String>,
    diff_hunks_map: HashMap<String, DiffHunkRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiffHunkRecord {
    #[serde(rename = "diffHunkID")]
    diff_hunk_id: String,
    raw_diffs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    #[serde(rename = "groupID")]
    group_id: String,
    #[serde(rename = "diffHunkIDs", default)]
    diff_hunk_ids: Vec<String>,
}

struct FileHunks {
    raw_headers: Vec<String>,
    hunks: HashMap<String, Vec<String>>,
}

fn read_diff_files(dir: &Path) -> ToolResult<HashMap<String, FileHunks>> {
    let mut files = HashMap::new();
    for path in list_json_files(dir)? {
        let record: DiffFileRecord = read_json(&path)?;
        tracing::debug!(file = %record.current_relative_path, id = %record.file_id, "loaded diff");
        let hunks = record
            .diff_hunks_map
            .into_values()
            .map(|hunk| (hunk.diff_hunk_id, hunk.raw_diffs))
            .collect();
        files.insert(
            record.file_id,
            FileHunks {
                raw_headers: record.raw_headers,
                hunks,
            },
        );
    }
    Ok(files)
}

/// Rebuild the single-hunk diff a `fileID:hunkID` reference points at.
fn build_hunk_diff(
    files: &HashMap<String, FileHunks>,
    reference: &str,
) -> Option<Result<Diff, untangle_api::ParseError>> {
    let (file_id, hunk_id) = reference.split_once(':')?;
    let file = files.get(file_id)?;
    let raw_diff = file.hunks.get(hunk_id)?;

    let mut text = file.raw_headers.join("\n");
    text.push('\n');
    text.push_str(&raw_diff.join("\n"));
    text.push('\n');
    Some(Diff::parse(&text))
}

fn list_json_files(dir: &Path) -> ToolResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| ToolError::io(dir, source))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| ToolError::io(dir, source))?.path();
        if path.extension().is_some_and(|extension| extension == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ToolResult<T> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::io(path, source))?;
    serde_json::from_str(&text).map_err(|err| ToolError::malformed(path, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> HashMap<String, FileHunks> {
        let mut hunks = HashMap::new();
        hunks.insert(
            "0".to_string(),
            vec![
                "@@ -3,2 +3,2 @@".to_string(),
                " int a;".to_string(),
                "-int b;".to_string(),
                "+long b;".to_string(),
            ],
        );
        let mut files = HashMap::new();
        files.insert(
            "7".to_string(),
            FileHunks {
                raw_headers: vec![
                    "diff --git a/src/A.java b/src/A.java".to_string(),
                    "--- a/src/A.java".to_string(),
                    "+++ b/src/A.java".to_string(),
                ],
                hunks,
            },
        );
        files
    }

    #[test]
    fn rebuilds_referenced_hunk() {
        let diff = build_hunk_diff(&files(), "7:0")
            .expect("known reference")
            .expect("valid hunk");
        let lines: Vec<_> = diff
            .changed_lines()
            .map(|(file, line)| (file.path().to_string(), line.source_line_no, line.target_line_no))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("src/A.java".to_string(), Some(4), None),
                ("src/A.java".to_string(), None, Some(4)),
            ]
        );
    }

    #[test]
    fn unknown_reference_is_none() {
        assert!(build_hunk_diff(&files(), "7:9").is_none());
        assert!(build_hunk_diff(&files(), "8:0").is_none());
        assert!(build_hunk_diff(&files(), "no-separator").is_none());
    }
}
