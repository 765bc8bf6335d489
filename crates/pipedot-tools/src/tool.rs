use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolResult;

/// A named capability the `tool` handler kind can invoke (§4.5).
///
/// ```
/// use async_trait::async_trait;
/// use pipedot_tools::{Tool, ToolResult};
/// use serde_json::Value;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Echoes its input back" }
///     async fn execute(&self, args: Value) -> ToolResult<Value> {
///         Ok(args)
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn execute(&self, args: Value) -> ToolResult<Value>;

    /// A JSON schema describing this tool's arguments, for LLM function
    /// calling. Default: an open object with no required fields.
    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
        })
    }
}
