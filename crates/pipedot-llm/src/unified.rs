use async_trait::async_trait;
use pipedot_core::{Message, ModelConfig, ToolSchema};

use crate::anthropic::AnthropicClient;
use crate::client::LlmClient;
use crate::error::LlmResult;
use crate::openai::OpenAiClient;
use crate::response::ChatResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderType {
    OpenAi,
    Anthropic,
}

/// Routes chat calls to the right provider based on the model id, so
/// handlers and swarm agents never have to know which backend a
/// `ModelConfig` resolves to.
pub struct UnifiedLlmClient {
    provider: ProviderType,
    openai: Option<OpenAiClient>,
    anthropic: Option<AnthropicClient>,
}

impl UnifiedLlmClient {
    pub fn new(config: &ModelConfig) -> Self {
        let provider = if config.model.starts_with("claude-") {
            ProviderType::Anthropic
        } else {
            ProviderType::OpenAi
        };
        match provider {
            ProviderType::Anthropic => Self {
                provider,
                openai: None,
                anthropic: Some(AnthropicClient::new(&config.model)),
            },
            ProviderType::OpenAi => Self {
                provider,
                openai: Some(OpenAiClient::new(&config.model, config.api_base.as_deref())),
                anthropic: None,
            },
        }
    }

    pub fn is_anthropic(&self) -> bool {
        self.provider == ProviderType::Anthropic
    }
}

#[async_trait]
impl LlmClient for UnifiedLlmClient {
    async fn chat(&self, system_prompt: &str, history: &[Message], user_input: &str) -> LlmResult<ChatResponse> {
        match self.provider {
            ProviderType::Anthropic => {
                self.anthropic.as_ref().expect("anthropic client set").chat(system_prompt, history, user_input).await
            }
            ProviderType::OpenAi => {
                self.openai.as_ref().expect("openai client set").chat(system_prompt, history, user_input).await
            }
        }
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_input: &str,
        tools: &[ToolSchema],
    ) -> LlmResult<ChatResponse> {
        match self.provider {
            ProviderType::Anthropic => {
                self.anthropic
                    .as_ref()
                    .expect("anthropic client set")
                    .chat_with_tools(system_prompt, history, user_input, tools)
                    .await
            }
            ProviderType::OpenAi => {
                self.openai
                    .as_ref()
                    .expect("openai client set")
                    .chat_with_tools(system_prompt, history, user_input, tools)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_claude_models_to_anthropic() {
        let config = ModelConfig {
            id: "claude".to_string(),
            name: "Claude".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            api_base: None,
        };
        let client = UnifiedLlmClient::new(&config);
        assert!(client.is_anthropic());
    }

    #[test]
    fn routes_gpt_models_to_openai() {
        let config = ModelConfig {
            id: "gpt".to_string(),
            name: "GPT-4".to_string(),
            model: "gpt-4o".to_string(),
            api_base: None,
        };
        let client = UnifiedLlmClient::new(&config);
        assert!(!client.is_anthropic());
    }
}
