//! Error taxonomy for the swarm orchestrator and the interviewer bridge
//! (§4.9, §4.10).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error(transparent)]
    Spec(#[from] pipedot_spec::SpecError),

    #[error(transparent)]
    Llm(#[from] pipedot_llm::LlmError),

    #[error("interviewer request cancelled")]
    Cancelled,

    #[error("interviewer request timed out")]
    TimedOut,

    #[error("no runner registered for role {0:?}")]
    UnknownRole(crate::agent::AgentRole),
}

pub type SwarmResult<T> = Result<T, SwarmError>;
