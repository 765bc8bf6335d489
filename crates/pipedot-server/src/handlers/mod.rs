//! HTTP route handlers for the pipeline server.

pub mod pipeline;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
