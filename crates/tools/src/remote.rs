//! Remote tools — a JSON POST to a configured URL.
//!
//! The request body is the argument object. The response is either
//! `{"result": ...}` or plain text; numeric results are rendered with
//! [`format_number`](crate::sum::format_number).

use async_trait::async_trait;
use ragchat_config::RemoteToolConfig;
use ragchat_core::error::ToolError;
use ragchat_core::tool::{Tool, ToolResult};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::sum::format_number;

pub struct RemoteTool {
    name: String,
    description: String,
    url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RemoteTool {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ToolError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: name.clone(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            description: format!("Remote tool '{name}'"),
            name,
            url: url.into(),
            timeout_secs,
            client,
        })
    }

    pub fn from_config(config: &RemoteToolConfig) -> Result<Self, ToolError> {
        let mut tool = Self::new(&config.name, &config.url, config.timeout_secs)?;
        if !config.description.is_empty() {
            tool.description = config.description.clone();
        }
        Ok(tool)
    }

    fn failed(&self, reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "additionalProperties": { "type": "string" } })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        debug!(tool = %self.name, url = %self.url, "Calling remote tool");

        let response = self
            .client
            .post(&self.url)
            .json(&arguments)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool_name: self.name.clone(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    self.failed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.failed(e.to_string()))?;
        if !status.is_success() {
            return Err(self.failed(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        let output = render_response(&body);
        if output.is_empty() {
            return Ok(ToolResult::failed("Error: empty response"));
        }
        Ok(ToolResult::ok(output))
    }
}

/// `{"result": 7}` → `"7"`, `{"result": "sunny"}` → `"sunny"`, other bodies verbatim.
fn render_response(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) if map.contains_key("result") => match &map["result"] {
            Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        _ => body.trim().to_string(),
    }
}
