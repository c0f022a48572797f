//! Intents: a pattern, an argument extractor, and the tool to invoke.

use ragchat_config::RemoteToolConfig;
use ragchat_core::tool::Tool;
use regex_lite::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::remote::RemoteTool;
use crate::sum::SumTool;

/// Decimal or integer, optionally negative.
const NUMBER: &str = r"(-?[0-9]+(?:\.[0-9]+)?)";

/// How a pattern match becomes tool arguments.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Positional groups 1..=n parsed as numbers and bound to these keys.
    Numbers(Vec<String>),
    /// Every named group becomes a string argument.
    NamedCaptures,
}

impl Extractor {
    /// `None` when a required group is missing or not numeric.
    pub fn extract(&self, captures: &Captures<'_>, pattern: &Regex) -> Option<Value> {
        let mut args = Map::new();
        match self {
            Extractor::Numbers(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    let n: f64 = captures.get(i + 1)?.as_str().parse().ok()?;
                    args.insert(key.clone(), serde_json::json!(n));
                }
            }
            Extractor::NamedCaptures => {
                for name in pattern.capture_names().flatten() {
                    let value = captures.name(name)?.as_str().trim();
                    args.insert(name.to_string(), Value::String(value.to_string()));
                }
            }
        }
        Some(Value::Object(args))
    }
}

/// One routing rule. Intents are tried in registration order.
#[derive(Clone)]
pub struct ToolIntent {
    pub name: String,
    pub pattern: Regex,
    pub extractor: Extractor,
    pub tool: Arc<dyn Tool>,
}

impl ToolIntent {
    pub fn new(name: impl Into<String>, pattern: Regex, extractor: Extractor, tool: Arc<dyn Tool>) -> Self {
        Self {
            name: name.into(),
            pattern,
            extractor,
            tool,
        }
    }

    /// Arguments for the first match in `input`, if any.
    pub fn match_args(&self, input: &str) -> Option<Value> {
        let captures = self.pattern.captures(input)?;
        self.extractor.extract(&captures, &self.pattern)
    }
}

/// The built-in addition intents, in priority order:
/// `a + b`, `a 加 b` / `a 加上 b`, `相加 a 和 b`, `求和 a 和 b`.
pub fn builtin_sum_intents() -> Vec<ToolIntent> {
    let tool: Arc<dyn Tool> = Arc::new(SumTool);
    let keys = vec!["a".to_string(), "b".to_string()];
    [
        ("sum_plus", format!(r"{NUMBER}\s*\+\s*{NUMBER}")),
        ("sum_jia", format!(r"{NUMBER}\s*加上?\s*{NUMBER}")),
        ("sum_xiangjia", format!(r"相加\s*{NUMBER}\s*和\s*{NUMBER}")),
        ("sum_qiuhe", format!(r"求和\s*{NUMBER}\s*和\s*{NUMBER}")),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| match Regex::new(&pattern) {
        Ok(re) => Some(ToolIntent::new(name, re, Extractor::Numbers(keys.clone()), tool.clone())),
        Err(e) => {
            warn!(intent = name, error = %e, "Built-in intent pattern failed to compile");
            None
        }
    })
    .collect()
}

/// Intents for one configured remote tool. Invalid patterns are skipped.
pub fn remote_intents(config: &RemoteToolConfig) -> Vec<ToolIntent> {
    let tool: Arc<dyn Tool> = match RemoteTool::from_config(config) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            warn!(tool = %config.name, error = %e, "Remote tool disabled");
            return Vec::new();
        }
    };

    config
        .patterns
        .iter()
        .enumerate()
        .filter_map(|(i, pattern)| match Regex::new(pattern) {
            Ok(re) => Some(ToolIntent::new(
                format!("{}#{i}", config.name),
                re,
                Extractor::NamedCaptures,
                tool.clone(),
            )),
            Err(e) => {
                warn!(tool = %config.name, pattern = %pattern, error = %e, "Skipping invalid tool pattern");
                None
            }
        })
        .collect()
}
