use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),

    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    OpenAi(#[from] async_openai::error::OpenAIError),
}

pub type LlmResult<T> = Result<T, LlmError>;
