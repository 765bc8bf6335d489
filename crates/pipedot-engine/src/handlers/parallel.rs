use async_trait::async_trait;
use pipedot_core::{Node, Outcome, OutcomeStatus};

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;

/// parallel (§4.5): fan-out sentinel. No work of its own; the scheduler
/// fans its outgoing edges out concurrently.
pub struct ParallelHandler;

#[async_trait]
impl Handler for ParallelHandler {
    async fn execute(&self, _ctx: &Context, _node: &Node) -> EngineResult<Outcome> {
        Ok(Outcome::success())
    }
}

/// parallel.fan_in (§4.5): join sentinel. Blocks (from the scheduler's
/// perspective, via in-degree accounting) until every upstream parallel
/// branch has settled; SUCCESS iff all upstream outcomes were SUCCESS.
pub struct FanInHandler;

impl FanInHandler {
    /// Evaluates the join outcome given the upstream branch outcomes the
    /// scheduler collected for this node's incoming edges.
    pub fn join(upstream: &[OutcomeStatus]) -> Outcome {
        if upstream.iter().all(|s| *s == OutcomeStatus::Success) {
            Outcome::success()
        } else {
            Outcome::fail("one or more parallel branches did not succeed")
        }
    }
}

#[async_trait]
impl Handler for FanInHandler {
    async fn execute(&self, _ctx: &Context, _node: &Node) -> EngineResult<Outcome> {
        // The scheduler calls `join` directly with the collected upstream
        // statuses once every incoming branch has settled; this path is
        // only reached for a fan-in node with no incoming edges recorded,
        // which counts as vacuously successful.
        Ok(Outcome::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_succeeds_when_all_upstream_succeed() {
        let outcome = FanInHandler::join(&[OutcomeStatus::Success, OutcomeStatus::Success]);
        assert_eq!(outcome.status, OutcomeStatus::Success);
    }

    #[test]
    fn join_fails_when_any_upstream_fails() {
        let outcome = FanInHandler::join(&[OutcomeStatus::Success, OutcomeStatus::Fail]);
        assert_eq!(outcome.status, OutcomeStatus::Fail);
    }
}
