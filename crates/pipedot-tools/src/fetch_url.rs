//! Fetches a URL and returns its text content, stripped of HTML markup.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ToolError, ToolResult};
use crate::tool::Tool;

pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetches a URL over HTTP(S) and returns its text content"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "the URL to fetch" },
            },
            "required": ["url"],
        })
    }

    async fn execute(&self, args: Value) -> ToolResult<Value> {
        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: "missing `url` argument".to_string(),
            })?;

        let response = self.client.get(url).send().await?;
        let body = response.text().await?;
        let text = html2text::from_read(body.as_bytes(), 120);

        Ok(serde_json::json!({ "url": url, "text": text }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_url() {
        let tool = FetchUrlTool::default();
        let schema = tool.schema();
        assert_eq!(schema["required"][0], "url");
    }

    #[tokio::test]
    async fn missing_url_argument_is_rejected() {
        let tool = FetchUrlTool::default();
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
