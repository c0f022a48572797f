//! `sum_two_numbers` — adds `a` and `b`.

use async_trait::async_trait;
use ragchat_core::error::ToolError;
use ragchat_core::tool::{Tool, ToolResult};
use serde_json::Value;

pub const SUM_TOOL_NAME: &str = "sum_two_numbers";

pub struct SumTool;

#[async_trait]
impl Tool for SumTool {
    fn name(&self) -> &str {
        SUM_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Add two numbers and return their sum."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "First addend" },
                "b": { "type": "number", "description": "Second addend" }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let a = number_arg(&arguments, "a")?;
        let b = number_arg(&arguments, "b")?;
        let sum = a + b;
        if !sum.is_finite() {
            return Ok(ToolResult::failed(format!("Error: {a} + {b} is not finite")));
        }

        Ok(ToolResult {
            success: true,
            output: format_number(sum),
            data: Some(serde_json::json!({ "result": sum })),
        })
    }
}

/// Accepts a JSON number or a numeric string.
fn number_arg(arguments: &Value, key: &str) -> Result<f64, ToolError> {
    match &arguments[key] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ToolError::InvalidArguments(format!("Missing or non-numeric '{key}' argument")))
}

/// Render a number: integral values without a decimal point, others with
/// the fewest digits that round-trip.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_have_no_decimal_point() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.0), "0");
    }

    #[test]
    fn fractions_use_minimal_digits() {
        assert_eq!(format_number(5.5), "5.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(-1.25), "-1.25");
    }

    #[tokio::test]
    async fn adds_numbers() {
        let result = SumTool.execute(serde_json::json!({"a": 3, "b": 4})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "7");
        assert_eq!(result.data.unwrap()["result"], 7.0);
    }

    #[tokio::test]
    async fn accepts_numeric_strings() {
        let result = SumTool.execute(serde_json::json!({"a": "3.5", "b": "2"})).await.unwrap();
        assert_eq!(result.output, "5.5");
    }

    #[tokio::test]
    async fn missing_argument_is_invalid() {
        let err = SumTool.execute(serde_json::json!({"a": 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
