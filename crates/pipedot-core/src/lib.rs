//! Graph model, condition evaluator, and shared domain types for the
//! pipeline engine (§3, §4.1, §4.4).

pub mod chat;
pub mod condition;
pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod outcome;
pub mod stylesheet;

pub use chat::{Message, MessageRole, ModelConfig, ToolCall, ToolCallResult, ToolSchema};
pub use condition::Condition;
pub use diagnostic::{Diagnostic, Severity};
pub use error::{CoreError, CoreResult};
pub use graph::{Attrs, Edge, Graph, Node, KNOWN_FIDELITIES, KNOWN_HANDLER_KINDS, KNOWN_SHAPES};
pub use outcome::{Outcome, OutcomeStatus};
pub use stylesheet::{Selector, Stylesheet, StylesheetRule};
