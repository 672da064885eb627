//! Tool adapter entry points.

mod service;

pub use untangle_tool_api::{
    DecompositionRequest, ToolAdapter, ToolError, ToolRegistry, ToolResult, ToolSummary,
};
pub use untangle_tools::{default_registry, FileUntanglingTool, FlexemeTool, SmartCommitTool};

pub use service::ToolService;
