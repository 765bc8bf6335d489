mod codergen;
mod conditional;
mod parallel;
mod start_exit;
mod stack_manager_loop;
mod tool;
mod wait_human;

pub use codergen::CodergenHandler;
pub use conditional::ConditionalHandler;
pub use parallel::{FanInHandler, ParallelHandler};
pub use start_exit::PassthroughHandler;
pub use stack_manager_loop::{StackDriver, StackManagerLoopHandler};
pub use tool::ToolHandler;
pub use wait_human::WaitHumanHandler;
