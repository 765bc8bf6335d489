//! Spec state-change events (§4.7): one broadcast per applied command, fed
//! to per-runner swarm subscriptions that never steal each other's events.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecEventKind {
    CoreUpdated,
    CardCreated,
    CardUpdated,
    CardMoved,
    CardDeleted,
    TranscriptAppended,
    HumanAsked,
    HumanAnswered,
    AgentStepStarted,
    AgentStepFinished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecEvent {
    pub seq: u64,
    pub kind: SpecEventKind,
    pub card_id: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
