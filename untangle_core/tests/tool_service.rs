use std::fs;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use untangle_core::api::{Group, GroundTruthRow, LineKey, ToolGroupAssignment};
use untangle_core::tools::{
    DecompositionRequest, ToolAdapter, ToolError, ToolRegistry, ToolResult, ToolService,
};
use untangle_core::Error;

#[derive(Default)]
struct FakeTool {
    requests: Arc<Mutex<Vec<usize>>>,
    empty: bool,
}

impl ToolAdapter for FakeTool {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn label(&self) -> &'static str {
        "Fake Tool"
    }

    fn output_file(&self) -> &'static str {
        "fake.csv"
    }

    fn decompose(&self, request: &DecompositionRequest<'_>) -> ToolResult<Vec<ToolGroupAssignment>> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.truth.len());
        if !request.result_path.exists() {
            return Err(ToolError::MissingOutput {
                path: request.result_path.to_path_buf(),
            });
        }
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(request
            .truth
            .iter()
            .map(|row| ToolGroupAssignment::new(row.key(), "g0"))
            .collect())
    }
}

fn truth() -> Vec<GroundTruthRow> {
    vec![
        GroundTruthRow::new(LineKey::new("A.java", Some(1), None), Group::Fix),
        GroundTruthRow::new(LineKey::new("A.java", None, Some(2)), Group::Other),
    ]
}

#[test]
fn tool_service_round_trip() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("raw.out");
    fs::write(&output, "raw").expect("write raw output");

    let tool = FakeTool::default();
    let requests = Arc::clone(&tool.requests);
    let mut registry = ToolRegistry::new();
    registry.register(tool);
    let service = ToolService::new(registry);

    let summaries = service.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, "fake");
    assert_eq!(summaries[0].output_file, "fake.csv");

    let truth = truth();
    let rows = service
        .decompose("fake", &DecompositionRequest::new(&output, &truth))
        .expect("decompose");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.group == "g0"));
    assert_eq!(requests.lock().expect("requests lock").as_slice(), &[2]);
}

#[test]
fn unknown_tool_is_reported() {
    let service = ToolService::new(ToolRegistry::new());
    let truth = truth();
    let temp = TempDir::new().expect("tempdir");
    let err = service
        .decompose("missing", &DecompositionRequest::new(temp.path(), &truth))
        .expect_err("unknown tool");
    assert!(matches!(err, Error::ToolNotRegistered { tool } if tool == "missing"));
}

#[test]
fn adapter_errors_are_wrapped() {
    let mut registry = ToolRegistry::new();
    registry.register(FakeTool::default());
    let service = ToolService::new(registry);

    let temp = TempDir::new().expect("tempdir");
    let truth = truth();
    let err = service
        .decompose(
            "fake",
            &DecompositionRequest::new(&temp.path().join("absent"), &truth),
        )
        .expect_err("missing output");
    assert!(matches!(
        err,
        Error::Tool {
            source: ToolError::MissingOutput { .. },
            ..
        }
    ));
}

#[test]
fn empty_decomposition_is_fatal() {
    let mut registry = ToolRegistry::new();
    registry.register(FakeTool {
        empty: true,
        ..FakeTool::default()
    });
    let service = ToolService::new(registry);

    let temp = TempDir::new().expect("tempdir");
    let truth = truth();
    let err = service
        .decompose("fake", &DecompositionRequest::new(temp.path(), &truth))
        .expect_err("empty output");
    assert!(matches!(err, Error::EmptyDecomposition { tool } if tool == "fake"));
}

#[test]
fn default_service_lists_study_tools() {
    let ids: Vec<String> = ToolService::default()
        .summaries()
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    assert_eq!(ids, vec!["file_untangling", "flexeme", "smartcommit"]);
}
