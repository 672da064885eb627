use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use untangle_api::{LineKey, ToolGroupAssignment};
use untangle_tool_api::{DecompositionRequest, ToolAdapter, ToolError, ToolResult};

const ADDED_COLOR: &str = "green";
const REMOVED_COLOR: &str = "red";
const DEFAULT_STATEMENTS: [&str; 3] = ["graph", "node", "edge"];

/// Adapter for Flexeme's program dependence graphs (Graphviz DOT files).
///
/// Changed nodes are the only nodes with a `color` attribute; each node
/// carries its group as a `N:` label prefix and the lines it covers as a
/// `span="start-end"` attribute.
#[derive(Debug, Default)]
pub struct FlexemeTool;

impl ToolAdapter for FlexemeTool {
    fn id(&self) -> &'static str {
        "flexeme"
    }

    fn label(&self) -> &'static str {
        "Flexeme"
    }

    fn output_file(&self) -> &'static str {
        "flexeme.csv"
    }

    fn decompose(&self, request: &DecompositionRequest<'_>) -> ToolResult<Vec<ToolGroupAssignment>> {
        // Flexeme writes no graph when it finds a single group.
        let text = fs::read_to_string(request.result_path)
            .map_err(|source| ToolError::io(request.result_path, source))?;
        parse_graph(request.result_path, &text)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Target,
}

/// Node statement: `id [attr=value, ...]`. Edge statements never match
/// because an operator follows their first id.
static NODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*("(?:[^"\\]|\\.)*"|[\w.]+)\s*\[((?:"(?:[^"\\]|\\.)*"|[^\]"])*)\]"#)
        .expect("Invalid node statement regex")
});

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)\s*=\s*("(?:[^"\\]|\\.)*"|[^,;\s\]]+)"#)
        .expect("Invalid attribute regex")
});

fn parse_graph(path: &Path, text: &str) -> ToolResult<Vec<ToolGroupAssignment>> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for captures in NODE_REGEX.captures_iter(text) {
        let node = unquote(&captures[1]);
        if DEFAULT_STATEMENTS.contains(&node.as_str()) {
            continue;
        }
        let attributes = parse_attributes(&captures[2]);

        let Some(color) = attributes.get("color") else {
            continue;
        };
        let side = match color.as_str() {
            ADDED_COLOR => Side::Target,
            REMOVED_COLOR => Side::Source,
            other => {
                tracing::warn!(node = %node, color = other, "skipping node with unsupported color");
                continue;
            }
        };
        let Some(label) = attributes.get("label") else {
            tracing::warn!(node = %node, "skipping changed node without label");
            continue;
        };
        let group = label.split(':').next().unwrap_or_default().to_string();

        let Some(file) = attributes
            .get("filepath")
            .or_else(|| attributes.get("cluster"))
        else {
            return Err(ToolError::malformed(
                path,
                format!("node {node} has neither filepath nor cluster"),
            ));
        };
        let span = attributes
            .get("span")
            .ok_or_else(|| ToolError::malformed(path, format!("node {node} has no span")))?;
        let (start, end) = parse_span(span)
            .ok_or_else(|| ToolError::malformed(path, format!("node {node} has bad span `{span}`")))?;

        for line in start..=end {
            let key = match side {
                Side::Source => LineKey::new(file.clone(), Some(line), None),
                Side::Target => LineKey::new(file.clone(), None, Some(line)),
            };
            let row = ToolGroupAssignment::new(key, group.clone());
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "parsed flexeme graph");
    Ok(rows)
}

fn parse_attributes(list: &str) -> HashMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(list)
        .map(|captures| (captures[1].to_string(), unquote(&captures[2])))
        .collect()
}

fn parse_span(span: &str) -> Option<(u32, u32)> {
    let (start, end) = span.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or_else(|| value.to_string(), |inner| inner.replace("\\\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"digraph "PDG" {
node [shape=box];
1 [cluster="src/A.java", color=green, label="0: int x = a[i];", span="10-11"];
2 [color=red, filepath="src/A.java", label="1: int x;", span="9-9"];
3 [label="unchanged", span="1-1"];
4 [color=blue, label="2: odd", span="1-1", filepath="src/A.java"];
2 -> 1 [color=red, label="data"];
5 [color=red, filepath="src/A.java", label="1: int x;", span="9-9"];
}
"#;

    #[test]
    fn extracts_changed_nodes_per_line() {
        let rows = parse_graph(Path::new("flexeme.dot"), GRAPH).expect("parse graph");
        assert_eq!(
            rows,
            vec![
                ToolGroupAssignment::new(LineKey::new("src/A.java", None, Some(10)), "0"),
                ToolGroupAssignment::new(LineKey::new("src/A.java", None, Some(11)), "0"),
                ToolGroupAssignment::new(LineKey::new("src/A.java", Some(9), None), "1"),
            ]
        );
    }

    #[test]
    fn missing_span_is_malformed() {
        let graph = "digraph G {\n1 [color=green, label=\"0: x\", filepath=\"A.java\"];\n}\n";
        let err = parse_graph(Path::new("g.dot"), graph).expect_err("span required");
        assert!(matches!(err, ToolError::Malformed { .. }));
    }

    #[test]
    fn missing_graph_is_missing_output() {
        let dir = std::env::temp_dir().join("untangle-flexeme-missing");
        let path = dir.join("flexeme.dot");
        let request = DecompositionRequest::new(&path, &[]);
        let err = FlexemeTool.decompose(&request).expect_err("no graph");
        assert!(matches!(err, ToolError::MissingOutput { .. }));
    }
}
