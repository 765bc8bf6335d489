//! Shared server state accessible from all handlers.

use std::collections::HashMap;
use std::sync::Arc;

use pipedot_config::{GraphPresetRegistry, RunConfig};
use pipedot_engine::Event;
use pipedot_llm::LlmClient;
use pipedot_tools::ToolRegistry;
use tokio::sync::RwLock;

pub struct ServerState {
    pub config: RunConfig,
    pub presets: GraphPresetRegistry,
    pub llm_client: Arc<dyn LlmClient>,
    pub tool_registry: Arc<ToolRegistry>,
    pub runs: RwLock<HashMap<String, Vec<Event>>>,
}
