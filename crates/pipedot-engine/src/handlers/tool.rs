use std::sync::Arc;

use async_trait::async_trait;
use pipedot_core::{Node, Outcome};
use pipedot_tools::ToolRegistry;

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;

/// tool (§4.5): invokes a named tool with attribute-supplied arguments.
/// `tool_name` selects the tool; `tool_args` is a JSON object literal, or
/// absent for no-argument tools.
pub struct ToolHandler {
    registry: Arc<ToolRegistry>,
}

impl ToolHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Handler for ToolHandler {
    async fn execute(&self, _ctx: &Context, node: &Node) -> EngineResult<Outcome> {
        let tool_name = node.attrs.get("tool_name");
        if tool_name.is_empty() {
            return Ok(Outcome::fail("tool node is missing `tool_name`"));
        }
        let args = match node.attrs.get_opt("tool_args") {
            Some(raw) => serde_json::from_str(raw).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Object(Default::default()),
        };

        match self.registry.invoke(tool_name, args).await {
            Ok(result) => Ok(Outcome::success().with_data("result", result)),
            Err(err) => Ok(Outcome::fail(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_name_fails_without_invoking_registry() {
        let handler = ToolHandler::new(Arc::new(ToolRegistry::new()));
        let node = Node::new("t");
        let ctx = Context::new();
        let outcome = handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Fail);
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_as_fail_outcome() {
        let handler = ToolHandler::new(Arc::new(ToolRegistry::new()));
        let mut node = Node::new("t");
        node.attrs.set("tool_name", "ghost");
        let ctx = Context::new();
        let outcome = handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Fail);
    }
}
