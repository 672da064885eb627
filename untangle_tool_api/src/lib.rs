mod registry;
mod types;

pub use registry::ToolRegistry;
pub use types::{DecompositionRequest, ToolError, ToolResult, ToolSummary};

use untangle_api::ToolGroupAssignment;

/// Trait implemented by adapters for third-party untangling tools (e.g., Flexeme).
pub trait ToolAdapter: Send + Sync {
    /// Stable identifier used for lookup and logging.
    fn id(&self) -> &'static str;

    /// Human-friendly tool name.
    fn label(&self) -> &'static str;

    /// File name of the normalized decomposition inside a commit's evaluation directory.
    fn output_file(&self) -> &'static str;

    /// Translate the tool's raw output into line-level group assignments.
    ///
    /// # Errors
    ///
    /// Implementors should surface missing or malformed tool output.
    fn decompose(&self, request: &DecompositionRequest<'_>) -> ToolResult<Vec<ToolGroupAssignment>>;
}
