use async_trait::async_trait;
use pipedot_core::{Message, MessageRole, ToolCall, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::LlmClient;
use crate::error::{LlmError, LlmResult};
use crate::response::ChatResponse;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicClient {
    http: reqwest::Client,
    model: String,
    api_base: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            model: model.to_string(),
            api_base: ANTHROPIC_API_BASE.to_string(),
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        }
    }

    fn to_anthropic_messages(history: &[Message], user_input: &str) -> Vec<AnthropicMessage> {
        let mut messages: Vec<AnthropicMessage> = history
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::User => "user".to_string(),
                    MessageRole::Assistant => "assistant".to_string(),
                    MessageRole::System => unreachable!("filtered above"),
                },
                content: m.content.clone(),
            })
            .collect();
        messages.push(AnthropicMessage {
            role: "user".to_string(),
            content: user_input.to_string(),
        });
        messages
    }

    async fn send(&self, body: serde_json::Value) -> LlmResult<AnthropicResponse> {
        let response = self
            .http
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Request(format!("anthropic returned {status}: {text}")));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .map_err(LlmError::Http)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: serde_json::Value },
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

fn split_blocks(blocks: Vec<AnthropicContentBlock>) -> (Option<String>, Vec<ToolCall>) {
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block {
            AnthropicContentBlock::Text { text } => text_parts.push(text),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall { id, name, arguments: input })
            }
        }
    }
    let content = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };
    (content, tool_calls)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system_prompt: &str, history: &[Message], user_input: &str) -> LlmResult<ChatResponse> {
        let messages = Self::to_anthropic_messages(history, user_input);
        let body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "system": system_prompt,
            "messages": messages,
        });
        let response = self.send(body).await?;
        let (content, tool_calls) = split_blocks(response.content);
        Ok(ChatResponse {
            content,
            tool_calls,
            input_tokens: Some(response.usage.input_tokens),
            output_tokens: Some(response.usage.output_tokens),
        })
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_input: &str,
        tools: &[ToolSchema],
    ) -> LlmResult<ChatResponse> {
        let messages = Self::to_anthropic_messages(history, user_input);
        let anthropic_tools: Vec<_> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();
        let body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "system": system_prompt,
            "messages": messages,
            "tools": anthropic_tools,
        });
        let response = self.send(body).await?;
        let (content, tool_calls) = split_blocks(response.content);
        Ok(ChatResponse {
            content,
            tool_calls,
            input_tokens: Some(response.usage.input_tokens),
            output_tokens: Some(response.usage.output_tokens),
        })
    }
}
