//! Handler contract and registry (§4.5).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pipedot_core::{Node, Outcome};

use crate::context::Context;
use crate::error::EngineResult;

/// Common contract every handler kind implements: `execute(ctx, node) ->
/// Outcome`. Inputs are read from the shared [`Context`] rather than passed
/// positionally, since a node's upstream outcomes are already folded in by
/// the scheduler before the handler runs.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn execute(&self, ctx: &Context, node: &Node) -> EngineResult<Outcome>;
}

/// Looks up a handler implementation by the node's resolved kind
/// (`Node::handler_kind`, §4.1/§4.3).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(kind).cloned()
    }
}
