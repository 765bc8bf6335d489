//! HTTP server entry point and Axum router setup (§13, ambient).
//!
//! Exposes the run/health surface only: `GET /health`, `POST /pipelines/run`,
//! `GET /pipelines/{run_id}/events`. The editor session-mutation surface of
//! §6 is an external, unimplemented contract.

mod dto;
mod error;
mod handlers;
mod runner;
mod state;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::Router;
use pipedot_config::{GraphPresetRegistry, RunConfig};
use pipedot_core::ModelConfig;
use pipedot_llm::UnifiedLlmClient;
use pipedot_tools::ToolRegistry;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::ServerState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".parse().unwrap()))
        .compact()
        .init();

    let state = Arc::new(init_server_state());

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!("request", method = %req.method(), uri = %req.uri(), version = ?req.version())
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(latency = %format!("{} ms", latency.as_millis()), status = %res.status().as_u16(), "finished processing request");
        });

    let logged_routes = Router::new()
        .route("/pipelines/run", axum::routing::post(handlers::pipeline::run))
        .route("/pipelines/{run_id}/events", get(handlers::pipeline::events))
        .layer(trace_layer);

    let app = Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state);

    let addr = "0.0.0.0:8000";
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initializes the server state: loads config, presets, and the LLM client.
fn init_server_state() -> ServerState {
    let config = RunConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "invalid run config, falling back to defaults");
        RunConfig::default()
    });

    let presets_dir = Path::new("presets");
    let presets = GraphPresetRegistry::load_from_dir(presets_dir).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to load graph presets");
        GraphPresetRegistry::new()
    });
    info!("Loaded {} graph presets", presets.list().len());

    let model = std::env::var("PIPEDOT_LLM_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let api_base = std::env::var("PIPEDOT_LLM_API_BASE").ok();
    let model_config = ModelConfig { id: "default".to_string(), name: model.clone(), model, api_base };
    let llm_client: Arc<dyn pipedot_llm::LlmClient> = Arc::new(UnifiedLlmClient::new(&model_config));

    let tool_registry = Arc::new(ToolRegistry::with_defaults());
    info!("Registered {} tools", tool_registry.list().len());

    ServerState { config, presets, llm_client, tool_registry, runs: RwLock::new(HashMap::new()) }
}
