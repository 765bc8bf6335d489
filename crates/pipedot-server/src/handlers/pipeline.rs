//! Pipeline run/events HTTP handlers (§6, §13).

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::Json;
use tracing::{error, info};

use pipedot_engine::{AutoAnswerInterviewer, Context, Engine, Event, EventSubscriber, MemoryCheckpointStore};

use crate::dto::{RunRequest, RunResponse};
use crate::error::AppError;
use crate::runner::SettledDriver;
use crate::ServerState;

struct Recorder(Mutex<Vec<Event>>);

impl EventSubscriber for Recorder {
    fn on_event(&self, event: &Event) {
        self.0.lock().expect("recorder mutex poisoned").push(event.clone());
    }
}

/// Runs a DOT pipeline to completion synchronously and returns its result.
pub async fn run(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let graph = pipedot_dot::parse(&req.dot).map_err(AppError::from)?;

    let interviewer = Arc::new(AutoAnswerInterviewer { answer: "yes".to_string() });
    let registry = pipedot_engine::default_handler_registry(
        state.llm_client.clone(),
        state.tool_registry.clone(),
        interviewer,
        Arc::new(SettledDriver),
    );

    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    let mut event_bus = pipedot_engine::EventBus::new();
    event_bus.subscribe(recorder.clone());

    let engine = Engine::new(graph, registry)
        .with_event_bus(event_bus)
        .with_default_max_retries(state.config.default_max_retries);

    let mut store = MemoryCheckpointStore::default();
    let mut ctx = Context::new();
    if let Some(input) = &req.input {
        ctx.set("input", input.as_str());
    }

    info!("running submitted pipeline");
    let result = engine.run(&mut store, &mut ctx).await.map_err(|err| {
        error!(error = %err, "pipeline run failed");
        AppError::from(err)
    })?;

    let run_id = uuid::Uuid::new_v4().to_string();
    let events = recorder.0.lock().expect("recorder mutex poisoned").clone();
    state.runs.write().await.insert(run_id.clone(), events);

    Ok(Json(RunResponse { run_id, result }))
}

/// Drains the buffered events for a previously run pipeline.
pub async fn events(
    State(state): State<Arc<ServerState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Vec<Event>>, AppError> {
    let runs = state.runs.read().await;
    let events = runs.get(&run_id).ok_or_else(|| AppError::NotFound(format!("unknown run id: {run_id}")))?;
    Ok(Json(events.clone()))
}
