//! Role-specialised agents and their per-runner context (§4.9).

use serde::{Deserialize, Serialize};

/// The four default role-specialised agents the orchestrator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Manager,
    Brainstormer,
    Planner,
    DotGenerator,
}

impl AgentRole {
    pub fn default_roles() -> Vec<AgentRole> {
        vec![AgentRole::Manager, AgentRole::Brainstormer, AgentRole::Planner, AgentRole::DotGenerator]
    }

    pub fn agent_id(&self) -> String {
        match self {
            AgentRole::Manager => "manager".to_string(),
            AgentRole::Brainstormer => "brainstormer".to_string(),
            AgentRole::Planner => "planner".to_string(),
            AgentRole::DotGenerator => "dot_generator".to_string(),
        }
    }

    /// The system prompt prefix identifying this role's responsibility,
    /// mirroring the specialised-persona pattern the underlying LLM stack
    /// uses for codergen prompts.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Manager => "You coordinate the spec authoring swarm: triage human input, delegate, and keep the plan coherent.",
            AgentRole::Brainstormer => "You propose ideas for the Ideas lane. Diverge broadly; do not worry about feasibility yet.",
            AgentRole::Planner => "You turn ideas into ordered, referenceable plan and task cards with clear acceptance criteria.",
            AgentRole::DotGenerator => "You translate the spec state into the exported DAG and sanity-check it renders and validates.",
        }
    }
}

/// Per-runner mutable context (§4.9), protected by a per-runner read/write
/// lock so snapshot collection and restore never block unrelated runners.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentContext {
    pub agent_id: String,
    pub rolling_summary: String,
    pub key_decisions: Vec<String>,
    pub last_event_seen: u64,
}

impl AgentContext {
    pub fn new(role: AgentRole) -> Self {
        Self { agent_id: role.agent_id(), rolling_summary: String::new(), key_decisions: Vec::new(), last_event_seen: 0 }
    }
}

/// One runner's opaque persisted context, keyed by role for restore
/// matching (§4.9 "Snapshot & restore").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_role: AgentRole,
    pub context: AgentContext,
}
