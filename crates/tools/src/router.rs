//! Intent router — decides whether a user message is a tool call.
//!
//! The first intent whose pattern matches and whose extractor succeeds wins.
//! A tool failure is never fatal: the original message passes through.

use ragchat_config::ToolsConfig;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::intent::{builtin_sum_intents, remote_intents, ToolIntent};

/// What the router did with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteOutcome {
    /// The tool's rendered output, or the original message
    pub content: String,
    /// Whether a tool produced `content`
    pub used: bool,
    /// The tool that was invoked, even when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl RouteOutcome {
    fn passthrough(input: &str, tool: Option<String>) -> Self {
        Self {
            content: input.to_string(),
            used: false,
            tool,
        }
    }
}

#[derive(Clone, Default)]
pub struct ToolRouter {
    intents: Vec<ToolIntent>,
}

impl ToolRouter {
    pub fn new(intents: Vec<ToolIntent>) -> Self {
        Self { intents }
    }

    /// Built-in intents first, then remote tools in config order.
    pub fn from_config(config: &ToolsConfig) -> Self {
        let mut intents = Vec::new();
        if config.builtin_sum {
            intents.extend(builtin_sum_intents());
        }
        for remote in &config.remote {
            intents.extend(remote_intents(remote));
        }

        let router = Self::new(intents);
        info!(intents = router.len(), tools = ?router.tool_names(), "Tool router ready");
        router
    }

    /// Append an intent; it is tried after all existing ones.
    pub fn push(&mut self, intent: ToolIntent) {
        self.intents.push(intent);
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Distinct tool names, in first-seen order.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for intent in &self.intents {
            let name = intent.tool.name();
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    pub async fn route(&self, input: &str) -> RouteOutcome {
        let text = input.trim();

        let Some((intent, args)) = self
            .intents
            .iter()
            .find_map(|i| i.match_args(text).map(|args| (i, args)))
        else {
            return RouteOutcome::passthrough(input, None);
        };

        let tool_name = intent.tool.name().to_string();
        debug!(intent = %intent.name, tool = %tool_name, args = %args, "Intent matched");

        let started = Instant::now();
        match intent.tool.execute(args).await {
            Ok(result) if result.success => {
                info!(
                    tool = %tool_name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                RouteOutcome {
                    content: result.output,
                    used: true,
                    tool: Some(tool_name),
                }
            }
            Ok(result) => {
                warn!(tool = %tool_name, output = %result.output, "Tool reported failure, passing message through");
                RouteOutcome::passthrough(input, Some(tool_name))
            }
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Tool call failed, passing message through");
                RouteOutcome::passthrough(input, Some(tool_name))
            }
        }
    }
}
