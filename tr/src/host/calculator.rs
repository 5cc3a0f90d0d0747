//! Calculator demo tools: add, multiply, greet

use async_trait::async_trait;
use serde_json::{Number, Value};
use tracing::debug;

use super::HostTool;
use crate::domain::ToolContent;
use crate::protocol::CallToolResult;

fn two_numbers_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "a": { "type": "number", "description": "First number" },
            "b": { "type": "number", "description": "Second number" }
        },
        "required": ["a", "b"]
    })
}

fn number_arg<'a>(input: &'a Value, key: &str) -> Result<&'a Number, String> {
    match input.get(key) {
        Some(Value::Number(n)) => Ok(n),
        Some(other) => Err(format!("{} must be a number, got {}", key, other)),
        None => Err(format!("{} is required", key)),
    }
}

/// Integer arithmetic when both operands are integers and the result fits,
/// floating point otherwise
fn combine(a: &Number, b: &Number, int_op: fn(i64, i64) -> Option<i64>, float_op: fn(f64, f64) -> f64) -> String {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(result) = int_op(x, y) {
            return result.to_string();
        }
    }
    float_op(a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default()).to_string()
}

/// Add two numbers together
pub struct AddTool;

#[async_trait]
impl HostTool for AddTool {
    fn name(&self) -> &'static str {
        "add"
    }

    fn description(&self) -> &'static str {
        "Add two numbers together"
    }

    fn input_schema(&self) -> Value {
        two_numbers_schema()
    }

    async fn execute(&self, input: Value) -> CallToolResult {
        debug!(?input, "AddTool::execute: called");
        let (a, b) = match (number_arg(&input, "a"), number_arg(&input, "b")) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return CallToolResult::error(e),
        };

        let result = combine(a, b, i64::checked_add, |x, y| x + y);
        CallToolResult::success(vec![ToolContent::text(format!("The sum of {} and {} is {}", a, b, result))])
    }
}

/// Multiply two numbers
pub struct MultiplyTool;

#[async_trait]
impl HostTool for MultiplyTool {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn description(&self) -> &'static str {
        "Multiply two numbers"
    }

    fn input_schema(&self) -> Value {
        two_numbers_schema()
    }

    async fn execute(&self, input: Value) -> CallToolResult {
        debug!(?input, "MultiplyTool::execute: called");
        let (a, b) = match (number_arg(&input, "a"), number_arg(&input, "b")) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return CallToolResult::error(e),
        };

        let result = combine(a, b, i64::checked_mul, |x, y| x * y);
        CallToolResult::success(vec![ToolContent::text(format!(
            "The product of {} and {} is {}",
            a, b, result
        ))])
    }
}

/// Generate a personalized greeting
pub struct GreetTool;

#[async_trait]
impl HostTool for GreetTool {
    fn name(&self) -> &'static str {
        "greet"
    }

    fn description(&self) -> &'static str {
        "Generate a personalized greeting"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Name to greet" }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, input: Value) -> CallToolResult {
        debug!(?input, "GreetTool::execute: called");
        match input["name"].as_str() {
            Some(name) => CallToolResult::success(vec![ToolContent::text(format!(
                "Hello, {}! Welcome to the MCP world!",
                name
            ))]),
            None => {
                debug!("GreetTool::execute: missing name parameter");
                CallToolResult::error("name is required")
            }
        }
    }
}
