use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] pipedot_core::CoreError),

    #[error("graph failed validation before execution: {0} error diagnostic(s)")]
    GraphInvalid(usize),

    #[error("no registered handler for kind `{0}`")]
    UnknownHandlerKind(String),

    #[error("node `{0}` has no start node to begin execution from")]
    NoStartNode,

    #[error("handler for node `{0}` failed: {1}")]
    HandlerFailed(String, String),

    #[error("node `{0}` exceeded its retry budget ({1} attempts)")]
    RetriesExhausted(String, u32),

    #[error("node `{0}` tripped loop detection after {1} executions")]
    LoopDetected(String, u32),

    #[error("execution was cancelled")]
    Cancelled,

    #[error("checkpoint is incompatible with the current graph (hash mismatch)")]
    ResumeIncompatible,

    #[error("checkpoint store error: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Llm(#[from] pipedot_llm::LlmError),

    #[error(transparent)]
    Tool(#[from] pipedot_tools::ToolError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
