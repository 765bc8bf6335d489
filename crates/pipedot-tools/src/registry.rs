use std::sync::Arc;

use serde_json::Value;

use crate::error::{ToolError, ToolResult};
use crate::fetch_url::FetchUrlTool;
use crate::tool::Tool;

/// Looks up tools by name for the `tool` handler kind (§4.5) and the swarm
/// orchestrator's per-agent-step tool set (§4.9).
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FetchUrlTool::default()));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn schemas(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "parameters": t.schema(),
                })
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> ToolResult<Value> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_registry_has_fetch_url() {
        let registry = ToolRegistry::with_defaults();
        assert!(registry.has("fetch_url"));
    }

    #[tokio::test]
    async fn invoking_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("ghost", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn register_replaces_same_named_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FetchUrlTool::default()));
        registry.register(Arc::new(FetchUrlTool::default()));
        assert_eq!(registry.list().len(), 1);
    }
}
