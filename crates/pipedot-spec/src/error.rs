//! Error taxonomy for spec-state mutation and graph export (§4.7, §4.8).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("lane not found: {0}")]
    LaneNotFound(String),

    #[error("question not found: {0}")]
    QuestionNotFound(String),

    #[error("command actor has shut down")]
    ActorGone,

    #[error(transparent)]
    Core(#[from] pipedot_core::CoreError),

    #[error("exporter produced an invalid graph: {0} error diagnostic(s)")]
    GeneratedInvalid(usize),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type SpecResult<T> = Result<T, SpecError>;
