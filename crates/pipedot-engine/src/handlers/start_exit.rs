use async_trait::async_trait;
use pipedot_core::{Node, Outcome};

use crate::context::Context;
use crate::error::EngineResult;
use crate::handler::Handler;

/// start / exit (§4.5): identity. The scheduler treats an exit node's
/// completion as terminal; the handler itself does no work.
pub struct PassthroughHandler;

#[async_trait]
impl Handler for PassthroughHandler {
    async fn execute(&self, _ctx: &Context, _node: &Node) -> EngineResult<Outcome> {
        Ok(Outcome::success())
    }
}
