use std::sync::Arc;

use async_trait::async_trait;
use pipedot_core::{Message, Node, Outcome};
use pipedot_llm::LlmClient;
use pipedot_tools::ToolRegistry;
use tracing::{info, warn};

use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::handler::Handler;

/// Maximum number of tool-call round trips before a codergen node gives up,
/// mirroring the agentic loop bound used by the underlying LLM stack.
const MAX_TOOL_ITERATIONS: usize = 10;

/// codergen (§4.5): invokes an external LLM collaborator. Prompt is the
/// node's `prompt` attribute (falling back to `label`); model resolution
/// follows §4.10 (direct `llm_model`, else the graph's `model_stylesheet`).
/// When `tools` names registered tools, runs a bounded think-act loop until
/// the LLM returns final content instead of a tool call.
pub struct CodergenHandler {
    client: Arc<dyn LlmClient>,
    tool_registry: Arc<ToolRegistry>,
}

impl CodergenHandler {
    pub fn new(client: Arc<dyn LlmClient>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self { client, tool_registry }
    }

    fn prompt_for(node: &Node) -> String {
        let prompt = node.attrs.get("prompt");
        if !prompt.is_empty() {
            prompt.to_string()
        } else {
            node.attrs.get("label").to_string()
        }
    }

    fn tools_for(node: &Node) -> Vec<String> {
        node.attrs
            .get_opt("tools")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Handler for CodergenHandler {
    async fn execute(&self, ctx: &Context, node: &Node) -> EngineResult<Outcome> {
        let prompt = Self::prompt_for(node);
        let input = ctx.get("input");
        let model = ctx.stylesheet().resolve(node, "llm_model").unwrap_or_else(|| "gpt-4o".to_string());
        let tool_names = Self::tools_for(node);

        if tool_names.is_empty() {
            let response = self.client.chat(&prompt, &[], input).await?;
            info!(node = %node.id, model = %model, chars = response.content.as_deref().unwrap_or("").len(), "codergen completed");
            return Ok(Outcome::success()
                .with_data("content", serde_json::Value::String(response.content.unwrap_or_default()))
                .with_data("diff_summary", serde_json::Value::Null));
        }

        let tool_schemas: Vec<_> = tool_names
            .iter()
            .filter_map(|name| self.tool_registry.get(name))
            .map(|tool| pipedot_core::ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            })
            .collect();

        if tool_schemas.is_empty() {
            warn!(node = %node.id, tools = ?tool_names, "no valid tools found in registry, falling back to plain chat");
            let response = self.client.chat(&prompt, &[], input).await?;
            return Ok(Outcome::success().with_data("content", serde_json::Value::String(response.content.unwrap_or_default())));
        }

        let mut history: Vec<Message> = vec![Message::user(input)];
        let mut tool_calls_made = Vec::new();

        for iteration in 1..=MAX_TOOL_ITERATIONS {
            let response = self.client.chat_with_tools(&prompt, &history, input, &tool_schemas).await?;

            if response.tool_calls.is_empty() {
                let content = response.content.unwrap_or_default();
                info!(node = %node.id, iterations = iteration, "codergen tool loop completed");
                let mut outcome = Outcome::success()
                    .with_data("content", serde_json::Value::String(content))
                    .with_data(
                        "tool_calls",
                        serde_json::Value::Array(tool_calls_made.iter().cloned().map(serde_json::Value::String).collect()),
                    );
                outcome.tool_calls = tool_calls_made;
                outcome.model = Some(model);
                outcome.tokens_used = response.total_tokens();
                return Ok(outcome);
            }

            for call in &response.tool_calls {
                let result = self
                    .tool_registry
                    .invoke(&call.name, call.arguments.clone())
                    .await
                    .map_err(EngineError::Tool)?;
                history.push(Message::assistant(format!("calling tool {}", call.name)));
                history.push(Message::user(result.to_string()));
                tool_calls_made.push(call.name.clone());
            }
        }

        Err(EngineError::HandlerFailed(
            node.id.clone(),
            format!("max tool iterations ({MAX_TOOL_ITERATIONS}) exceeded"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipedot_llm::{ChatResponse, LlmResult};

    struct StubClient {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for StubClient {
        async fn chat(&self, _system_prompt: &str, _history: &[Message], _user_input: &str) -> LlmResult<ChatResponse> {
            Ok(ChatResponse {
                content: Some(self.reply.clone()),
                ..Default::default()
            })
        }

        async fn chat_with_tools(
            &self,
            _system_prompt: &str,
            _history: &[Message],
            _user_input: &str,
            _tools: &[pipedot_core::ToolSchema],
        ) -> LlmResult<ChatResponse> {
            Ok(ChatResponse {
                content: Some(self.reply.clone()),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn plain_chat_without_tools() {
        let handler = CodergenHandler::new(
            Arc::new(StubClient { reply: "done".to_string() }),
            Arc::new(ToolRegistry::new()),
        );
        let mut node = Node::new("w");
        node.attrs.set("prompt", "write the thing");
        let mut ctx = Context::new();
        ctx.set("input", "please");
        let outcome = handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Success);
        assert_eq!(outcome.data.get("content").unwrap().as_str(), Some("done"));
    }

    #[tokio::test]
    async fn model_falls_back_to_graph_stylesheet() {
        let handler = CodergenHandler::new(
            Arc::new(StubClient { reply: "done".to_string() }),
            Arc::new(ToolRegistry::new()),
        );
        let mut node = Node::new("w");
        node.attrs.set("prompt", "write the thing");
        let mut ctx = Context::new();
        ctx.set("input", "please");
        ctx.set_stylesheet(pipedot_core::Stylesheet::parse("* { llm_model: claude-3-5-sonnet; }"));
        let outcome = handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Success);
    }
}
