use std::sync::Arc;

use async_trait::async_trait;
use pipedot_core::{Node, Outcome};

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;
use crate::interviewer::{Interviewer, Question};

/// wait.human (§4.5): delegates to the Interviewer (§4.10); the answer
/// becomes outcome data under `answer`. Timeout/cancellation surfaces as a
/// FAIL outcome rather than propagating the engine error, so a `retry_target`
/// can route around it per §4.6.
pub struct WaitHumanHandler {
    interviewer: Arc<dyn Interviewer>,
}

impl WaitHumanHandler {
    pub fn new(interviewer: Arc<dyn Interviewer>) -> Self {
        Self { interviewer }
    }
}

#[async_trait]
impl Handler for WaitHumanHandler {
    async fn execute(&self, ctx: &Context, node: &Node) -> EngineResult<Outcome> {
        let prompt = node.attrs.get("prompt").to_string();
        let options: Vec<String> = node
            .attrs
            .get_opt("options")
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        match self
            .interviewer
            .ask(ctx.get("current_node"), Question { prompt, options })
            .await
        {
            Ok(answer) => Ok(Outcome::success().with_data("answer", serde_json::Value::String(answer))),
            Err(err) => Ok(Outcome::fail(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interviewer::AutoAnswerInterviewer;

    #[tokio::test]
    async fn auto_answer_populates_outcome_data() {
        let handler = WaitHumanHandler::new(Arc::new(AutoAnswerInterviewer { answer: "yes".to_string() }));
        let mut node = Node::new("ask");
        node.attrs.set("prompt", "Proceed?");
        let ctx = Context::new();
        let outcome = handler.execute(&ctx, &node).await.unwrap();
        assert_eq!(outcome.status, pipedot_core::OutcomeStatus::Success);
        assert_eq!(outcome.data.get("answer").unwrap().as_str(), Some("yes"));
    }
}
