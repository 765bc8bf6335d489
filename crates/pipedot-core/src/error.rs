//! Error taxonomy for the graph model and condition evaluator.

use thiserror::Error;

/// Errors raised by graph construction, mutation, and condition evaluation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("node already exists: {0}")]
    Duplicate(String),

    #[error("edge endpoint does not exist: {0}")]
    UnknownEndpoint(String),

    #[error("parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("graph failed validation with {0} error diagnostic(s)")]
    ValidationError(usize),

    #[error("graph is invalid: {0} error diagnostic(s) present")]
    GraphInvalid(usize),

    #[error("exporter produced an invalid graph: {0} error diagnostic(s) present")]
    GeneratedInvalid(usize),

    #[error("invalid condition syntax: {0}")]
    ConditionSyntax(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
