//! HTTP-facing error mapping (§6, §7, §11).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<pipedot_core::CoreError> for AppError {
    fn from(err: pipedot_core::CoreError) -> Self {
        match err {
            pipedot_core::CoreError::ParseError { .. } | pipedot_core::CoreError::ValidationError(_) => {
                AppError::BadRequest(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<pipedot_engine::EngineError> for AppError {
    fn from(err: pipedot_engine::EngineError) -> Self {
        match err {
            pipedot_engine::EngineError::GraphInvalid(_) | pipedot_engine::EngineError::Core(_) => {
                AppError::BadRequest(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
