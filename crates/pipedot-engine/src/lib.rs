//! DAG scheduler, handler registry, and the retry/checkpoint/event
//! infrastructure that backs pipeline execution (§4.5, §4.6).

pub mod checkpoint;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod interviewer;
pub mod retry;
pub mod scheduler;

use std::sync::Arc;

pub use checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore, NdjsonCheckpointStore};
pub use context::Context;
pub use error::{EngineError, EngineResult};
pub use event::{Event, EventBus, EventKind, EventSubscriber};
pub use handler::{Handler, HandlerRegistry};
pub use interviewer::{AutoAnswerInterviewer, Interviewer, Question};
pub use retry::RetryPolicy;
pub use scheduler::{CancellationToken, Engine, RunResult, RunStatus};

use pipedot_llm::LlmClient;
use pipedot_tools::ToolRegistry;

/// Builds a [`HandlerRegistry`] wired with the built-in handler kinds
/// (§4.5), sharing a single LLM client and tool registry across the
/// handlers that need them.
pub fn default_handler_registry(
    llm_client: Arc<dyn LlmClient>,
    tool_registry: Arc<ToolRegistry>,
    interviewer: Arc<dyn Interviewer>,
    stack_driver: Arc<dyn handlers::StackDriver>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("start", Arc::new(handlers::PassthroughHandler));
    registry.register("exit", Arc::new(handlers::PassthroughHandler));
    registry.register("codergen", Arc::new(handlers::CodergenHandler::new(llm_client, tool_registry.clone())));
    registry.register("conditional", Arc::new(handlers::ConditionalHandler));
    registry.register("parallel", Arc::new(handlers::ParallelHandler));
    registry.register("parallel.fan_in", Arc::new(handlers::FanInHandler));
    registry.register("wait.human", Arc::new(handlers::WaitHumanHandler::new(interviewer)));
    registry.register("tool", Arc::new(handlers::ToolHandler::new(tool_registry)));
    registry.register("stack.manager_loop", Arc::new(handlers::StackManagerLoopHandler::new(stack_driver)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use async_trait::async_trait;
    use pipedot_core::{Message, ToolSchema};
    use pipedot_llm::{ChatResponse, LlmResult};

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn chat(&self, _system_prompt: &str, _history: &[Message], user_input: &str) -> LlmResult<ChatResponse> {
            Ok(ChatResponse { content: Some(format!("echo: {user_input}")), ..Default::default() })
        }

        async fn chat_with_tools(
            &self,
            system_prompt: &str,
            history: &[Message],
            user_input: &str,
            _tools: &[ToolSchema],
        ) -> LlmResult<ChatResponse> {
            self.chat(system_prompt, history, user_input).await
        }
    }

    struct NoopDriver;

    #[async_trait]
    impl handlers::StackDriver for NoopDriver {
        async fn step(
            &self,
            _ctx: &Context,
            _node: &pipedot_core::Node,
            _iteration: u32,
        ) -> EngineResult<(pipedot_core::Outcome, bool)> {
            Ok((pipedot_core::Outcome::success(), true))
        }
    }

    fn test_registry() -> HandlerRegistry {
        default_handler_registry(
            Arc::new(EchoClient),
            Arc::new(ToolRegistry::new()),
            Arc::new(AutoAnswerInterviewer { answer: "yes".to_string() }),
            Arc::new(NoopDriver),
        )
    }

    #[tokio::test]
    async fn linear_pipeline_runs_to_completion() {
        let dot = r#"
            digraph g {
                start [shape=Mdiamond, type=start];
                work [shape=box, type=codergen, prompt="do the thing"];
                exit [shape=Msquare, type=exit];
                start -> work;
                work -> exit;
            }
        "#;
        let graph = pipedot_dot::parse(dot).unwrap();
        let engine = Engine::new(graph, test_registry());
        let mut store = MemoryCheckpointStore::default();
        let mut ctx = Context::new();
        ctx.set("input", "hello");
        let result = engine.run(&mut store, &mut ctx).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.completed_node_ids, vec!["start".to_string(), "work".to_string(), "exit".to_string()]);
    }

    #[tokio::test]
    async fn conditional_branch_follows_matching_label() {
        let dot = r#"
            digraph g {
                start [shape=Mdiamond, type=start];
                gate [shape=diamond, type=conditional, condition="ready = yes"];
                good [shape=box, type=codergen, prompt="go"];
                bad [shape=box, type=codergen, prompt="stop"];
                exit [shape=Msquare, type=exit];
                start -> gate;
                gate -> good [label="success", condition="outcome = SUCCESS"];
                gate -> bad [label="fail", condition="outcome = FAIL"];
                good -> exit;
                bad -> exit;
            }
        "#;
        let graph = pipedot_dot::parse(dot).unwrap();
        let engine = Engine::new(graph, test_registry());
        let mut store = MemoryCheckpointStore::default();
        let mut ctx = Context::new();
        ctx.set("input", "hello");
        ctx.set("ready", "yes");
        let result = engine.run(&mut store, &mut ctx).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.completed_node_ids.contains(&"good".to_string()));
        assert!(!result.completed_node_ids.contains(&"bad".to_string()));
        assert!(result.completed_node_ids.contains(&"exit".to_string()));
    }

    struct Recorder(std::sync::Mutex<Vec<String>>);

    impl EventSubscriber for Recorder {
        fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind.as_str().to_string());
        }
    }

    /// Fails every call; used with `retry_target` to exercise the retry
    /// budget without ever letting the node itself succeed.
    struct AlwaysFailHandler;

    #[async_trait]
    impl Handler for AlwaysFailHandler {
        async fn execute(&self, _ctx: &Context, _node: &pipedot_core::Node) -> EngineResult<pipedot_core::Outcome> {
            Err(EngineError::HandlerFailed("work".to_string(), "boom".to_string()))
        }
    }

    #[tokio::test]
    async fn retry_budget_emits_one_retrying_event_per_retry_then_reroutes() {
        let dot = r#"
            digraph g {
                start [shape=Mdiamond, type=start];
                prepare [shape=box, type=codergen, prompt="prepare"];
                work [shape=box, type=always_fail, max_retries=2, retry_target=prepare];
                exit [shape=Msquare, type=exit];
                start -> prepare;
                prepare -> work;
                work -> exit;
            }
        "#;
        let graph = pipedot_dot::parse(dot).unwrap();
        let mut registry = test_registry();
        registry.register("always_fail", Arc::new(AlwaysFailHandler));
        let recorder = Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
        let mut bus = EventBus::new();
        bus.subscribe(recorder.clone());
        let engine = Engine::new(graph, registry).with_event_bus(bus);
        let mut store = MemoryCheckpointStore::default();
        let mut ctx = Context::new();
        ctx.set("input", "hello");
        engine.run(&mut store, &mut ctx).await.unwrap();

        let events = recorder.0.lock().unwrap();
        let retrying_count = events.iter().filter(|e| e.as_str() == "stage.retrying").count();
        assert_eq!(retrying_count, 2, "max_retries=2 should allow 2 retries (3 total attempts): {events:?}");
        assert_eq!(events.iter().filter(|e| e.as_str() == "stage.failed").count(), 1);
    }

    #[tokio::test]
    async fn invalid_graph_is_rejected_before_execution() {
        let dot = r#"
            digraph g {
                work [shape=box, type=codergen, prompt="do"];
            }
        "#;
        let graph = pipedot_dot::parse(dot).unwrap();
        let engine = Engine::new(graph, test_registry());
        let mut store = MemoryCheckpointStore::default();
        let mut ctx = Context::new();
        let err = engine.run(&mut store, &mut ctx).await.unwrap_err();
        assert!(matches!(err, EngineError::GraphInvalid(_)));
    }
}
