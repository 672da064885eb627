use std::sync::Arc;

use untangle_api::ToolGroupAssignment;

use super::{default_registry, DecompositionRequest, ToolAdapter, ToolRegistry, ToolSummary};
use crate::{Error, Result};

/// High-level façade for running tool adapters.
#[derive(Clone)]
pub struct ToolService {
    registry: Arc<ToolRegistry>,
}

impl ToolService {
    /// Create a tool service backed by the provided registry.
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// List summaries for all registered tools.
    #[must_use]
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.registry.summaries()
    }

    /// Translate a tool's raw output into line-level group assignments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotRegistered`] when the id is unknown,
    /// [`Error::Tool`] for adapter failures and
    /// [`Error::EmptyDecomposition`] when the adapter found no lines.
    pub fn decompose(
        &self,
        tool_id: &str,
        request: &DecompositionRequest<'_>,
    ) -> Result<Vec<ToolGroupAssignment>> {
        let tool = self.tool(tool_id)?;
        let rows = tool.decompose(request).map_err(|source| Error::Tool {
            tool: tool_id.to_string(),
            source,
        })?;

        if rows.is_empty() {
            tracing::warn!(
                tool = tool_id,
                path = %request.result_path.display(),
                "tool decomposition is empty"
            );
            return Err(Error::EmptyDecomposition {
                tool: tool_id.to_string(),
            });
        }
        tracing::debug!(tool = tool_id, rows = rows.len(), "decomposed tool output");
        Ok(rows)
    }

    fn tool(&self, tool_id: &str) -> Result<Arc<dyn ToolAdapter>> {
        self.registry
            .get(tool_id)
            .ok_or_else(|| Error::ToolNotRegistered {
                tool: tool_id.to_string(),
            })
    }
}

impl Default for ToolService {
    fn default() -> Self {
        Self::new(default_registry())
    }
}

impl std::fmt::Debug for ToolService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolService")
            .field("tools", &self.registry.ids())
            .finish()
    }
}
