//! Multi-agent swarm orchestrator (§4.9) and the engine-facing human-gate
//! bridge (§4.10).

pub mod agent;
pub mod error;
pub mod interviewer;
pub mod orchestrator;

pub use agent::{AgentContext, AgentRole, AgentSnapshot};
pub use error::{SwarmError, SwarmResult};
pub use interviewer::{BridgeInterviewer, PendingAsk};
pub use orchestrator::Orchestrator;
