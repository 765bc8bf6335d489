use async_trait::async_trait;
use pipedot_core::{Condition, Node, Outcome};

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;

/// conditional (§4.5): evaluates a boolean derived from the node's
/// `condition` attribute against the current context bag, producing
/// SUCCESS or FAIL to drive a labelled success/fail branch.
pub struct ConditionalHandler;

#[async_trait]
impl Handler for ConditionalHandler {
    async fn execute(&self, ctx: &Context, node: &Node) -> EngineResult<Outcome> {
        let predicate = node.attrs.get("condition");
        let condition = Condition::parse(predicate)?;
        let holds = condition.evaluate(ctx.bag());
        Ok(if holds {
            Outcome::success().with_label("success")
        } else {
            Outcome::fail("condition did not hold").with_label("fail")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with_condition(cond: &str) -> Node {
        let mut n = Node::new("gate");
        n.attrs.set("condition", cond);
        n
    }

    #[tokio::test]
    async fn success_when_condition_holds() {
        let mut ctx = Context::new();
        ctx.set("status", "done");
        let handler = ConditionalHandler;
        let outcome = handler.execute(&ctx, &node_with_condition("status = done")).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Success);
        assert_eq!(outcome.preferred_label.as_deref(), Some("success"));
    }

    #[tokio::test]
    async fn fail_when_condition_does_not_hold() {
        let ctx = Context::new();
        let handler = ConditionalHandler;
        let outcome = handler.execute(&ctx, &node_with_condition("status = done")).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Fail);
        assert_eq!(outcome.preferred_label.as_deref(), Some("fail"));
    }
}
