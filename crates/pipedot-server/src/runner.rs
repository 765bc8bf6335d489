//! Minimal stack driver for the synchronous run surface: a
//! `stack.manager_loop` node settles after a single iteration. The swarm
//! orchestrator (`pipedot-swarm`) is the real driver for interactive runs;
//! this binary's run endpoint drives graphs end to end without a human in
//! the loop.

use async_trait::async_trait;
use pipedot_core::{Node, Outcome};
use pipedot_engine::{handlers::StackDriver, Context, EngineResult};

pub struct SettledDriver;

#[async_trait]
impl StackDriver for SettledDriver {
    async fn step(&self, _ctx: &Context, _node: &Node, _iteration: u32) -> EngineResult<(Outcome, bool)> {
        Ok((Outcome::success(), true))
    }
}
