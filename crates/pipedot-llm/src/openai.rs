use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FunctionObject,
    ChatCompletionToolArgs, ChatCompletionToolType,
};
use async_openai::Client;
use async_trait::async_trait;
use pipedot_core::{Message, MessageRole, ToolCall, ToolSchema};

use crate::client::LlmClient;
use crate::error::{LlmError, LlmResult};
use crate::response::ChatResponse;

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiClient {
    pub fn new(model: &str, api_base: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new();
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    fn build_history(system_prompt: &str, history: &[Message], user_input: &str) -> LlmResult<Vec<async_openai::types::ChatCompletionRequestMessage>> {
        let mut messages = vec![ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(LlmError::OpenAi)?
            .into()];
        for msg in history {
            let built = match msg.role {
                MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(LlmError::OpenAi)?
                    .into(),
                MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(LlmError::OpenAi)?
                    .into(),
                MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(LlmError::OpenAi)?
                    .into(),
            };
            messages.push(built);
        }
        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(LlmError::OpenAi)?
                .into(),
        );
        Ok(messages)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, system_prompt: &str, history: &[Message], user_input: &str) -> LlmResult<ChatResponse> {
        let messages = Self::build_history(system_prompt, history, user_input)?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(LlmError::OpenAi)?;
        let response = self.client.chat().create(request).await.map_err(LlmError::OpenAi)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("no choices in response".to_string()))?;
        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: Vec::new(),
            input_tokens: response.usage.as_ref().map(|u| u.prompt_tokens as u64),
            output_tokens: response.usage.as_ref().map(|u| u.completion_tokens as u64),
        })
    }

    async fn chat_with_tools(
        &self,
        system_prompt: &str,
        history: &[Message],
        user_input: &str,
        tools: &[ToolSchema],
    ) -> LlmResult<ChatResponse> {
        let messages = Self::build_history(system_prompt, history, user_input)?;
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(messages);
        if !tools.is_empty() {
            let built_tools = tools
                .iter()
                .map(|t| {
                    ChatCompletionToolArgs::default()
                        .r#type(ChatCompletionToolType::Function)
                        .function(FunctionObject {
                            name: t.name.clone(),
                            description: Some(t.description.clone()),
                            parameters: Some(t.parameters.clone()),
                            strict: None,
                        })
                        .build()
                        .map_err(LlmError::OpenAi)
                })
                .collect::<LlmResult<Vec<_>>>()?;
            builder.tools(built_tools);
        }
        let request = builder.build().map_err(LlmError::OpenAi)?;
        let response = self.client.chat().create(request).await.map_err(LlmError::OpenAi)?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Parse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                let arguments = serde_json::from_str(&tc.function.arguments).unwrap_or(serde_json::Value::Null);
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls,
            input_tokens: response.usage.as_ref().map(|u| u.prompt_tokens as u64),
            output_tokens: response.usage.as_ref().map(|u| u.completion_tokens as u64),
        })
    }
}
