//! Named tool registry for the `tool` handler kind (§4.5).

pub mod error;
pub mod fetch_url;
pub mod registry;
pub mod tool;

pub use error::{ToolError, ToolResult};
pub use fetch_url::FetchUrlTool;
pub use registry::ToolRegistry;
pub use tool::Tool;
