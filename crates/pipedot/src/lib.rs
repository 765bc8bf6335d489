//! # pipedot — DAG pipeline engine with multi-agent spec authoring
//!
//! pipedot executes declarative task graphs written in a DOT dialect:
//! typed handler nodes, condition-routed edges, retries, checkpoints, and
//! a structured event bus. A second surface, the spec/swarm pair, lets a
//! small team of role-specialised agents co-author a project spec as a
//! card board and export it straight into a runnable graph.
//!
//! ## Quick start — parse and run
//!
//! ```rust,ignore
//! use pipedot::prelude::*;
//!
//! let graph = pipedot_dot::parse(dot_source)?;
//! let registry = default_handler_registry(llm_client, tool_registry, interviewer, stack_driver);
//! let engine = Engine::new(graph, registry);
//! let mut store = MemoryCheckpointStore::default();
//! let mut ctx = Context::new();
//! let result = engine.run(&mut store, &mut ctx).await?;
//! ```
//!
//! ## Crate structure
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`pipedot_core`] | Graph model, condition evaluator, stylesheet, error types |
//! | [`pipedot_dot`] | DOT-dialect parser and serializer |
//! | [`pipedot_validate`] | Lint rules over a parsed graph |
//! | [`pipedot_engine`] | DAG execution engine, handlers, checkpoints, events |
//! | [`pipedot_spec`] | Spec state, card/lane model, graph exporter |
//! | [`pipedot_swarm`] | Multi-agent orchestrator and human-gate bridge |
//! | [`pipedot_llm`] | LLM providers (OpenAI, Anthropic) |
//! | [`pipedot_tools`] | Tool registry and built-in tools |
//! | [`pipedot_config`] | Run configuration and graph presets |

// Re-export config types
pub use pipedot_config::{ConfigError, GraphPreset, GraphPresetRegistry, RunConfig};

// Re-export core types
pub use pipedot_core::{
    Attrs, Condition, CoreError, Diagnostic, Edge, Graph, Message, MessageRole, ModelConfig, Node, Outcome,
    OutcomeStatus, Severity, Stylesheet, ToolCall, ToolSchema,
};

// Re-export DOT parsing/serialization
pub use pipedot_dot::{parse, serialize};

// Re-export validator
pub use pipedot_validate::{validate, validate_or_raise};

// Re-export engine
pub use pipedot_engine::{
    default_handler_registry, CancellationToken, Checkpoint, CheckpointStore, Context, Engine, EngineError, Event,
    EventBus, EventKind, Handler, HandlerRegistry, Interviewer, MemoryCheckpointStore, NdjsonCheckpointStore,
    Question, RetryPolicy, RunResult, RunStatus,
};

// Re-export spec/swarm
pub use pipedot_spec::{spawn_spec_actor, Card, CardType, Command, Lane, SpecCore, SpecEvent, SpecHandle, SpecState};
pub use pipedot_swarm::{AgentContext, AgentRole, BridgeInterviewer, Orchestrator};

// Re-export LLM clients
pub use pipedot_llm::{AnthropicClient, ChatResponse, LlmClient, LlmError, OpenAiClient, UnifiedLlmClient};

// Re-export tools
pub use pipedot_tools::{Tool, ToolError, ToolRegistry};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pipedot::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Context, Engine, Graph, RunResult, RunStatus};
    pub use crate::{MemoryCheckpointStore, default_handler_registry};
    pub use crate::{parse, serialize, validate};
    pub use crate::{SpecHandle, SpecState, spawn_spec_actor};
    pub use crate::{LlmClient, UnifiedLlmClient};
    pub use crate::{Tool, ToolRegistry};
}
