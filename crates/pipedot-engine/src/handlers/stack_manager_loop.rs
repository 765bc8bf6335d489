use std::sync::Arc;

use async_trait::async_trait;
use pipedot_core::{Node, Outcome};

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;

/// One iteration of whatever drives a `stack.manager_loop` node — the swarm
/// orchestrator's per-agent-step loop (§4.9) is the concrete implementation;
/// this trait keeps the engine crate free of a dependency on the swarm
/// crate's agent/runner types.
#[async_trait]
pub trait StackDriver: Send + Sync {
    /// Runs one driven iteration and reports whether the stack settled
    /// (no more work pending) alongside the iteration's outcome.
    async fn step(&self, ctx: &Context, node: &Node, iteration: u32) -> EngineResult<(Outcome, bool)>;
}

/// stack.manager_loop (§4.5): an iterative driver for agent swarms, bounded
/// by the node's `max_retries` (default 10 iterations when unset).
pub struct StackManagerLoopHandler {
    driver: Arc<dyn StackDriver>,
}

impl StackManagerLoopHandler {
    pub fn new(driver: Arc<dyn StackDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl Handler for StackManagerLoopHandler {
    async fn execute(&self, ctx: &Context, node: &Node) -> EngineResult<Outcome> {
        let max_iterations: u32 = node.attrs.get_opt("max_retries").and_then(|v| v.parse().ok()).unwrap_or(10);

        let mut last_outcome = Outcome::success();
        for iteration in 1..=max_iterations {
            let (outcome, settled) = self.driver.step(ctx, node, iteration).await?;
            last_outcome = outcome;
            if settled {
                break;
            }
        }
        Ok(last_outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingDriver {
        settle_at: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl StackDriver for CountingDriver {
        async fn step(&self, _ctx: &Context, _node: &Node, iteration: u32) -> EngineResult<(Outcome, bool)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((Outcome::success(), iteration >= self.settle_at))
        }
    }

    #[tokio::test]
    async fn stops_once_settled() {
        let driver = Arc::new(CountingDriver { settle_at: 3, calls: AtomicU32::new(0) });
        let handler = StackManagerLoopHandler::new(driver.clone());
        let node = Node::new("loop");
        let ctx = Context::new();
        handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(driver.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn respects_max_retries_attribute() {
        let driver = Arc::new(CountingDriver { settle_at: 100, calls: AtomicU32::new(0) });
        let handler = StackManagerLoopHandler::new(driver.clone());
        let mut node = Node::new("loop");
        node.attrs.set("max_retries", "4");
        let ctx = Context::new();
        handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(driver.calls.load(Ordering::SeqCst), 4);
    }
}
