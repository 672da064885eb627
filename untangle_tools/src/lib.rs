mod file_untangling;
mod flexeme;
mod smartcommit;

pub use file_untangling::FileUntanglingTool;
pub use flexeme::FlexemeTool;
pub use smartcommit::SmartCommitTool;

use untangle_tool_api::ToolRegistry;

/// Build a tool registry populated with the adapters for every evaluated tool.
#[must_use]
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SmartCommitTool);
    registry.register(FlexemeTool);
    registry.register(FileUntanglingTool);
    registry
}
