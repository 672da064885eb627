//! Tool registry keeps track of available adapters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ToolAdapter, ToolSummary};

/// In-memory registry for tool adapters.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn ToolAdapter>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter keyed by its `ToolAdapter::id`.
    pub fn register<T>(&mut self, tool: T)
    where
        T: ToolAdapter + 'static,
    {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already shared adapter.
    pub fn register_arc(&mut self, tool: Arc<dyn ToolAdapter>) {
        self.tools.insert(tool.id(), tool);
    }

    /// Retrieve an adapter by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn ToolAdapter>> {
        self.tools.get(id).cloned()
    }

    /// Returns the registered identifiers in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.tools.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Summaries for all registered adapters, sorted by identifier.
    #[must_use]
    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.tools.get(id))
            .map(|tool| ToolSummary {
                id: tool.id().to_string(),
                label: tool.label().to_string(),
                output_file: tool.output_file().to_string(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.ids())
            .finish()
    }
}
