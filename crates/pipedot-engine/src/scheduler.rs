//! DAG execution engine (§4.6): ready-queue scheduler, retry/backoff,
//! checkpointing, event bus, cancellation, and loop detection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use pipedot_core::{Edge, Graph, Outcome, OutcomeStatus};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::checkpoint::{graph_hash, Checkpoint, CheckpointStore};
use crate::context::Context;
use crate::error::{EngineError, EngineResult};
use crate::event::{Event, EventBus, EventKind};
use crate::handler::HandlerRegistry;
use crate::retry::RetryPolicy;

/// Per-node execution count past which the engine treats the next
/// invocation as a failure (§4.6).
const LOOP_DETECTION_THRESHOLD: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub completed_node_ids: Vec<String>,
    pub outcomes: IndexMap<String, Outcome>,
}

/// Signals cooperative cancellation across handler invocations (§5).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Engine {
    graph: Graph,
    registry: HandlerRegistry,
    event_bus: EventBus,
    default_max_retries: u32,
    cancellation: CancellationToken,
}

impl Engine {
    pub fn new(graph: Graph, registry: HandlerRegistry) -> Self {
        Self {
            graph,
            registry,
            event_bus: EventBus::new(),
            default_max_retries: 2,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    pub fn with_default_max_retries(mut self, n: u32) -> Self {
        self.default_max_retries = n;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Runs the pipeline from the start node (§4.6, steps 1-6).
    pub async fn run(&self, store: &mut dyn CheckpointStore, ctx: &mut Context) -> EngineResult<RunResult> {
        let diagnostics = pipedot_validate::validate(&self.graph);
        let error_count = diagnostics.iter().filter(|d| d.severity == pipedot_core::Severity::Error).count();
        if error_count > 0 {
            return Err(EngineError::GraphInvalid(error_count));
        }

        self.load_stylesheet(ctx);
        let start = self.graph.find_start_node().ok_or(EngineError::NoStartNode)?;
        self.execute_loop(start.id.clone(), HashSet::new(), IndexMap::new(), Vec::new(), store, ctx, 0)
            .await
    }

    /// Resumes a pipeline from the latest checkpoint in `store` (§4.6,
    /// §6). Pre-marks checkpointed nodes complete and restarts the ready
    /// queue from `last_node_id`.
    pub async fn resume(&self, store: &mut dyn CheckpointStore, ctx: &mut Context) -> EngineResult<RunResult> {
        let diagnostics = pipedot_validate::validate(&self.graph);
        let error_count = diagnostics.iter().filter(|d| d.severity == pipedot_core::Severity::Error).count();
        if error_count > 0 {
            return Err(EngineError::GraphInvalid(error_count));
        }

        self.load_stylesheet(ctx);
        let checkpoint = store.load_latest()?.ok_or(EngineError::NoStartNode)?;
        if checkpoint.graph_hash != graph_hash(&self.graph) {
            return Err(EngineError::ResumeIncompatible);
        }

        let resume_node = checkpoint
            .last_node_id
            .clone()
            .ok_or(EngineError::NoStartNode)?;
        let completed: HashSet<String> = checkpoint.completed_node_ids.iter().cloned().collect();
        for (node_id, outcome) in &checkpoint.outcomes {
            ctx.apply_outcome(node_id, outcome);
        }

        self.execute_loop(
            resume_node,
            completed,
            checkpoint.outcomes.clone(),
            checkpoint.completed_node_ids.clone(),
            store,
            ctx,
            checkpoint.seq,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_loop(
        &self,
        start_node: String,
        mut completed: HashSet<String>,
        mut outcomes: IndexMap<String, Outcome>,
        mut completed_order: Vec<String>,
        store: &mut dyn CheckpointStore,
        ctx: &mut Context,
        start_seq: u64,
    ) -> EngineResult<RunResult> {
        let hash = graph_hash(&self.graph);
        let mut seq = start_seq;
        let mut execution_counts: HashMap<String, u32> = HashMap::new();
        let mut satisfied_edges: HashSet<String> = HashSet::new();

        self.event_bus.publish(Event::new(EventKind::PipelineStarted, None, now()));

        let mut ready: VecDeque<String> = VecDeque::new();
        ready.push_back(start_node);

        'nodes: while let Some(node_id) = ready.pop_front() {
            if self.cancellation.is_cancelled() {
                self.event_bus.publish(
                    Event::new(EventKind::PipelineFailed, None, now())
                        .with_data(serde_json::json!({"message": "cancelled"})),
                );
                return Ok(RunResult { status: RunStatus::Cancelled, completed_node_ids: completed_order, outcomes });
            }
            if completed.contains(&node_id) {
                continue;
            }

            let node = self
                .graph
                .find_node(&node_id)
                .ok_or_else(|| EngineError::Core(pipedot_core::CoreError::NotFound(node_id.clone())))?;

            let count = execution_counts.entry(node_id.clone()).or_insert(0);
            *count += 1;
            if *count > LOOP_DETECTION_THRESHOLD {
                warn!(node = %node_id, count = *count, "loop detection threshold exceeded");
                self.event_bus.publish(
                    Event::new(EventKind::AgentLoopDetected, Some(node_id.clone()), now())
                        .with_data(serde_json::json!({"count": *count})),
                );
                return Err(EngineError::LoopDetected(node_id, *count));
            }

            ctx.set("current_node", node_id.clone());
            self.event_bus.publish(Event::new(EventKind::StageStarted, Some(node_id.clone()), now()));

            let kind = node.handler_kind();

            let outcome = if kind == "parallel.fan_in" {
                // The fan-in outcome is a pure function of the upstream
                // branch outcomes, not of the (vacuous) registered handler.
                let upstream: Vec<OutcomeStatus> = self
                    .graph
                    .incoming_edges(&node_id)
                    .iter()
                    .filter_map(|e| outcomes.get(&e.from).map(|o| o.status))
                    .collect();
                crate::handlers::FanInHandler::join(&upstream)
            } else {
                let handler = self
                    .registry
                    .resolve(&kind)
                    .ok_or_else(|| EngineError::UnknownHandlerKind(kind.clone()))?;

                let node_max_retries: Option<u32> = node.attrs.get_opt("max_retries").and_then(|v| v.parse().ok());
                let policy = RetryPolicy::for_node(node_max_retries, self.default_max_retries);

                let mut attempt = 1u32;
                loop {
                    let result = handler.execute(ctx, node).await;
                    match result {
                        Ok(outcome) => break outcome,
                        Err(err) if policy.allows_attempt(attempt) => {
                            warn!(node = %node_id, attempt, error = %err, "handler attempt failed, retrying");
                            self.event_bus.publish(
                                Event::new(EventKind::StageRetrying, Some(node_id.clone()), now())
                                    .with_data(serde_json::json!({"attempt": attempt})),
                            );
                            tokio::time::sleep(policy.backoff(attempt)).await;
                            attempt += 1;
                        }
                        Err(err) => {
                            error!(node = %node_id, error = %err, "handler exhausted retries");
                            self.event_bus.publish(Event::new(EventKind::StageFailed, Some(node_id.clone()), now()));
                            if let Some(target) = node.attrs.get_opt("retry_target") {
                                completed.insert(node_id.clone());
                                completed_order.push(node_id.clone());
                                outcomes.insert(node_id.clone(), Outcome::fail(err.to_string()));
                                ready.push_back(target.to_string());
                                continue 'nodes;
                            }
                            self.event_bus.publish(
                                Event::new(EventKind::PipelineFailed, None, now())
                                    .with_data(serde_json::json!({"message": err.to_string()})),
                            );
                            return Ok(RunResult {
                                status: RunStatus::Failed(err.to_string()),
                                completed_node_ids: completed_order,
                                outcomes,
                            });
                        }
                    }
                }
            };

            ctx.apply_outcome(&node_id, &outcome);
            self.event_bus.publish(
                Event::new(EventKind::StageCompleted, Some(node_id.clone()), now())
                    .with_data(serde_json::json!({"outcome": outcome.status.as_str()})),
            );

            completed.insert(node_id.clone());
            completed_order.push(node_id.clone());
            outcomes.insert(node_id.clone(), outcome.clone());

            if node.is_exit() {
                seq += 1;
                store.save(&Checkpoint {
                    seq,
                    completed_node_ids: completed_order.clone(),
                    last_node_id: Some(node_id.clone()),
                    outcomes: outcomes.clone(),
                    graph_hash: hash.clone(),
                })?;
                self.event_bus.publish(Event::new(EventKind::CheckpointSaved, Some(node_id.clone()), now()));
                self.event_bus.publish(Event::new(EventKind::PipelineCompleted, None, now()));
                return Ok(RunResult { status: RunStatus::Completed, completed_node_ids: completed_order, outcomes });
            }

            if outcome.status == OutcomeStatus::Fail {
                if let Some(target) = node.attrs.get_opt("retry_target") {
                    ready.push_back(target.to_string());
                    continue;
                }
            }

            let eligible = self.eligible_outgoing(&node_id, ctx.bag());
            for edge in self.select_edges(&kind, eligible) {
                satisfied_edges.insert(edge.id.clone());
                if self.predecessors_satisfied(&edge.to, &satisfied_edges) {
                    ready.push_back(edge.to.clone());
                }
            }

            seq += 1;
            store.save(&Checkpoint {
                seq,
                completed_node_ids: completed_order.clone(),
                last_node_id: Some(node_id.clone()),
                outcomes: outcomes.clone(),
                graph_hash: hash.clone(),
            })?;
            self.event_bus.publish(Event::new(EventKind::CheckpointSaved, Some(node_id.clone()), now()));
        }

        info!("ready queue drained without reaching an exit node");
        self.event_bus.publish(Event::new(EventKind::PipelineCompleted, None, now()));
        Ok(RunResult { status: RunStatus::Completed, completed_node_ids: completed_order, outcomes })
    }

    /// Parses the graph-level `model_stylesheet` attribute once per run and
    /// hands it to the context so codergen handlers can resolve models that
    /// have no direct `llm_model` attribute (§4.10).
    fn load_stylesheet(&self, ctx: &mut Context) {
        if let Some(source) = self.graph.graph_attrs.get_opt("model_stylesheet") {
            ctx.set_stylesheet(pipedot_core::Stylesheet::parse(source));
        }
    }

    fn eligible_outgoing(&self, node_id: &str, bag: &IndexMap<String, String>) -> Vec<Edge> {
        self.graph
            .outgoing_edges(node_id)
            .into_iter()
            .filter(|edge| pipedot_core::condition::evaluate(edge.condition(), bag).unwrap_or(false))
            .cloned()
            .collect()
    }

    /// `parallel` nodes fan every eligible edge out concurrently; every
    /// other kind follows a single edge, tie-broken by descending weight
    /// then stable insertion order (§4.4).
    fn select_edges(&self, kind: &str, mut eligible: Vec<Edge>) -> Vec<Edge> {
        if kind == "parallel" {
            return eligible;
        }
        eligible.sort_by(|a, b| b.weight().unwrap_or(0).cmp(&a.weight().unwrap_or(0)));
        eligible.into_iter().next().into_iter().collect()
    }

    /// Only a `parallel.fan_in` node waits for every incoming edge to have
    /// fired — that is the whole point of a join. Every other node kind,
    /// including one reached by conditional divergence/convergence or a
    /// cycle back-edge, becomes ready the moment any single incoming edge
    /// fires: its other incoming edges belong to mutually exclusive
    /// branches (or a loop back-edge not yet taken) that may never fire at
    /// all.
    fn predecessors_satisfied(&self, node_id: &str, satisfied: &HashSet<String>) -> bool {
        let incoming = self.graph.incoming_edges(node_id);
        if incoming.is_empty() {
            return true;
        }
        let is_fan_in = self.graph.find_node(node_id).map(|n| n.handler_kind() == "parallel.fan_in").unwrap_or(false);
        if is_fan_in {
            incoming.iter().all(|e| satisfied.contains(&e.id))
        } else {
            incoming.iter().any(|e| satisfied.contains(&e.id))
        }
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
