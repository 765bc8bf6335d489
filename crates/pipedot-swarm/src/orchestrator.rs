//! Swarm orchestrator (§4.9): drives the default role-specialised agents
//! against a single spec state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pipedot_core::{Message, ToolSchema};
use pipedot_llm::LlmClient;
use pipedot_spec::{Command, SpecEvent, SpecHandle};
use pipedot_tools::{Tool, ToolRegistry, ToolResult};
use tokio::sync::{broadcast, Notify, RwLock};
use tracing::{info, warn};

use crate::agent::{AgentContext, AgentRole, AgentSnapshot};

const MAX_AGENT_STEP_ITERATIONS: usize = 10;
const IDLE_SLEEP_ACTIVE: Duration = Duration::from_secs(1);
const IDLE_SLEEP_QUIET: Duration = Duration::from_secs(5);
const PAUSED_SLEEP: Duration = Duration::from_millis(500);

/// A tool that ends the current agent step with a diff summary, the way
/// the codergen agentic loop's final turn has no further tool calls.
struct FinishStepTool {
    finished: Arc<AtomicBool>,
    summary: Arc<RwLock<Option<String>>>,
}

#[async_trait]
impl Tool for FinishStepTool {
    fn name(&self) -> &str {
        "finish_step"
    }

    fn description(&self) -> &str {
        "Ends the current agent step, recording a diff summary of what changed."
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult<serde_json::Value> {
        let summary = args.get("summary").and_then(|v| v.as_str()).unwrap_or("no summary provided").to_string();
        *self.summary.write().await = Some(summary.clone());
        self.finished.store(true, Ordering::SeqCst);
        Ok(serde_json::json!({"acknowledged": true}))
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"],
        })
    }
}

struct Runner {
    role: AgentRole,
    context: Arc<RwLock<AgentContext>>,
    event_rx: broadcast::Receiver<SpecEvent>,
}

/// Drives N (default 4) role-specialised agents against a single spec
/// state (§4.9).
pub struct Orchestrator {
    spec: SpecHandle,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    runners: RwLock<Vec<Runner>>,
    paused: AtomicBool,
    cancelled: AtomicBool,
    pub human_message_notify: Arc<Notify>,
}

impl Orchestrator {
    pub fn new(spec: SpecHandle, llm: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            spec,
            llm,
            tools,
            runners: RwLock::new(Vec::new()),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            human_message_notify: Arc::new(Notify::new()),
        }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Recovers any missing runner slots by instantiating defaults
    /// (§4.9 main loop step a).
    async fn recover_slots(&self) {
        let mut runners = self.runners.write().await;
        for role in AgentRole::default_roles() {
            if !runners.iter().any(|r| r.role == role) {
                runners.push(Runner {
                    role,
                    context: Arc::new(RwLock::new(AgentContext::new(role))),
                    event_rx: self.spec.subscribe(),
                });
            }
        }
    }

    /// Runs the main loop until cancelled (§4.9). Each cycle advances
    /// every runner one step, then sleeps an idle interval that a human
    /// message interrupts.
    pub async fn run(&self) {
        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                break;
            }
            self.recover_slots().await;

            if self.paused.load(Ordering::SeqCst) {
                tokio::time::sleep(PAUSED_SLEEP).await;
                continue;
            }

            let did_work = self.run_cycle().await;

            let sleep = if did_work { IDLE_SLEEP_ACTIVE } else { IDLE_SLEEP_QUIET };
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = self.human_message_notify.notified() => {
                    self.run_step_for_role(AgentRole::Manager).await;
                }
            }
        }
    }

    async fn run_cycle(&self) -> bool {
        let roles: Vec<AgentRole> = { self.runners.read().await.iter().map(|r| r.role).collect() };
        let mut did_work = false;
        for role in roles {
            if self.paused.load(Ordering::SeqCst) {
                break;
            }
            self.drain_events(role).await;
            if self.run_step_for_role(role).await {
                did_work = true;
            }
        }
        did_work
    }

    async fn drain_events(&self, role: AgentRole) {
        let mut runners = self.runners.write().await;
        let Some(runner) = runners.iter_mut().find(|r| r.role == role) else { return };
        let mut context = runner.context.write().await;
        loop {
            match runner.event_rx.try_recv() {
                Ok(event) => {
                    context.rolling_summary.push_str(&format!(" | {:?}", event.kind));
                    context.last_event_seen = event.seq;
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
    }

    /// Executes one bounded think-act step for `role` (§4.9 "Agent step").
    /// Returns whether the agent produced any tool call this step.
    async fn run_step_for_role(&self, role: AgentRole) -> bool {
        let agent_id = role.agent_id();
        let _ = self.spec.apply(Command::StartAgentStep { agent_id: agent_id.clone(), description: format!("{role:?} step") }).await;

        let summary = self.spec.read(|state| format!("goal: {}; cards: {}", state.core.goal, state.exportable_cards().len())).await;

        let finished = Arc::new(AtomicBool::new(false));
        let diff_summary: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));
        let mut step_tools = (*self.tools).clone();
        step_tools.register(Arc::new(FinishStepTool { finished: finished.clone(), summary: diff_summary.clone() }));

        let schemas: Vec<ToolSchema> = step_tools
            .list()
            .into_iter()
            .filter_map(|name| step_tools.get(name))
            .map(|tool| ToolSchema { name: tool.name().to_string(), description: tool.description().to_string(), parameters: tool.schema() })
            .collect();

        let prompt = format!("{}\n\nCurrent state: {}", role.system_prompt(), summary);
        let mut history: Vec<Message> = Vec::new();
        let mut produced_work = false;

        let result = async {
            for _ in 0..MAX_AGENT_STEP_ITERATIONS {
                let response = self.llm.chat_with_tools(&prompt, &history, "continue", &schemas).await?;
                if response.tool_calls.is_empty() {
                    break;
                }
                produced_work = true;
                for call in &response.tool_calls {
                    let invocation = step_tools.invoke(&call.name, call.arguments.clone()).await;
                    let outcome = match invocation {
                        Ok(value) => value.to_string(),
                        Err(err) => format!("error: {err}"),
                    };
                    history.push(Message::assistant(format!("calling tool {}", call.name)));
                    history.push(Message::user(outcome));
                }
                if finished.load(Ordering::SeqCst) {
                    break;
                }
            }
            Ok::<(), pipedot_llm::LlmError>(())
        }
        .await;

        if let Err(err) = result {
            warn!(agent = %agent_id, error = %err, "agent step failed");
            let _ = self
                .spec
                .apply(Command::AppendTranscript { sender: agent_id.clone(), content: format!("step failed: {err}") })
                .await;
        }

        let summary = diff_summary.read().await.clone().unwrap_or_else(|| "no changes recorded".to_string());
        let _ = self.spec.apply(Command::FinishAgentStep { agent_id: agent_id.clone(), diff_summary: summary }).await;
        info!(agent = %agent_id, "finished agent step");

        produced_work
    }

    /// Emits a per-agent-id snapshot of runner context for persistence
    /// (§4.9 "Snapshot & restore").
    pub async fn snapshot(&self) -> Vec<AgentSnapshot> {
        let runners = self.runners.read().await;
        let mut snapshots = Vec::with_capacity(runners.len());
        for runner in runners.iter() {
            let context = runner.context.read().await.clone();
            snapshots.push(AgentSnapshot { agent_role: runner.role, context });
        }
        snapshots
    }

    /// Restores runner context from a snapshot, matching on `agent_role`.
    pub async fn restore(&self, snapshots: Vec<AgentSnapshot>) {
        self.recover_slots().await;
        let by_role: HashMap<AgentRole, AgentContext> = snapshots.into_iter().map(|s| (s.agent_role, s.context)).collect();
        let runners = self.runners.read().await;
        for runner in runners.iter() {
            if let Some(saved) = by_role.get(&runner.role) {
                let mut context = runner.context.write().await;
                context.rolling_summary = saved.rolling_summary.clone();
                context.key_decisions = saved.key_decisions.clone();
                context.last_event_seen = saved.last_event_seen;
            }
        }
    }

    /// Unsubscribes every agent's event channel on shutdown (§4.9
    /// "Cleanup").
    pub async fn cleanup(&self) {
        self.runners.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipedot_llm::{ChatResponse, LlmResult};
    use pipedot_spec::{spawn_spec_actor, SpecCore, SpecState};

    struct NoToolsClient;

    #[async_trait]
    impl LlmClient for NoToolsClient {
        async fn chat(&self, _system_prompt: &str, _history: &[Message], _user_input: &str) -> LlmResult<ChatResponse> {
            Ok(ChatResponse { content: Some("done".to_string()), ..Default::default() })
        }

        async fn chat_with_tools(
            &self,
            _system_prompt: &str,
            _history: &[Message],
            _user_input: &str,
            _tools: &[ToolSchema],
        ) -> LlmResult<ChatResponse> {
            Ok(ChatResponse { content: Some("done".to_string()), ..Default::default() })
        }
    }

    #[tokio::test]
    async fn recover_slots_creates_all_default_roles() {
        let spec = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let orchestrator = Orchestrator::new(spec, Arc::new(NoToolsClient), Arc::new(ToolRegistry::new()));
        orchestrator.recover_slots().await;
        assert_eq!(orchestrator.runners.read().await.len(), 4);
    }

    #[tokio::test]
    async fn step_with_no_tool_calls_finishes_with_default_summary() {
        let spec = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let orchestrator = Orchestrator::new(spec.clone(), Arc::new(NoToolsClient), Arc::new(ToolRegistry::new()));
        let produced = orchestrator.run_step_for_role(AgentRole::Manager).await;
        assert!(!produced);
    }

    #[tokio::test]
    async fn snapshot_and_restore_round_trip_rolling_summary() {
        let spec = spawn_spec_actor(SpecState::new(SpecCore::new("demo")));
        let orchestrator = Orchestrator::new(spec, Arc::new(NoToolsClient), Arc::new(ToolRegistry::new()));
        orchestrator.recover_slots().await;
        {
            let runners = orchestrator.runners.read().await;
            let manager = runners.iter().find(|r| r.role == AgentRole::Manager).unwrap();
            manager.context.write().await.rolling_summary = "saw X".to_string();
        }
        let snapshot = orchestrator.snapshot().await;
        orchestrator.cleanup().await;
        orchestrator.restore(snapshot).await;
        let runners = orchestrator.runners.read().await;
        let manager = runners.iter().find(|r| r.role == AgentRole::Manager).unwrap();
        assert_eq!(manager.context.read().await.rolling_summary, "saw X");
    }
}
