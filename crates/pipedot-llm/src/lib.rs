//! Provider-routed LLM client layer (§11, ambient). Consumed by the
//! codergen handler (§4.5) and the swarm orchestrator's agent step (§4.9).

mod anthropic;
mod client;
mod error;
mod openai;
mod response;
mod unified;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::{LlmError, LlmResult};
pub use openai::OpenAiClient;
pub use response::ChatResponse;
pub use unified::UnifiedLlmClient;
