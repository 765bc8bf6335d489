use async_trait::async_trait;
use pipedot_core::{Message, ToolSchema};

use crate::error::LlmResult;
use crate::response::ChatResponse;

/// Common contract for LLM providers, consumed by the codergen handler
/// (§4.5) and the swarm orchestrator's agent step (§4.9).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, system_prompt: &str, history: &[Message], user_input: &str) -> LlmResult<ChatResponse>;

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_input: &str,
        tools: &[ToolSchema],
    ) -> LlmResult<ChatResponse>;
}
