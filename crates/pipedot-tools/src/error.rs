use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;
