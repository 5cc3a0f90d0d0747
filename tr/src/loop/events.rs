//! Progress events emitted while a query runs

use serde_json::Value;

use crate::llm::TokenUsage;

/// Observable activity of a running query
///
/// Sent fire-and-forget; a closed receiver never stalls the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// A model call is about to be made
    ModelCallStarted { turn: u32 },

    /// A tool call is about to be forwarded to the host
    ToolCallStarted {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },

    /// A tool call came back
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        is_error: bool,
    },

    /// The final answer is ready; `usage` sums every model call of the query
    AnswerReady { model_calls: u32, usage: TokenUsage },
}

impl LoopEvent {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            LoopEvent::ModelCallStarted { .. } => "ModelCallStarted",
            LoopEvent::ToolCallStarted { .. } => "ToolCallStarted",
            LoopEvent::ToolCallFinished { .. } => "ToolCallFinished",
            LoopEvent::AnswerReady { .. } => "AnswerReady",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = LoopEvent::ToolCallStarted {
            call_id: "c1".to_string(),
            tool_name: "add".to_string(),
            arguments: serde_json::json!({"a": 2, "b": 3}),
        };
        assert_eq!(event.event_type(), "ToolCallStarted");
        let done = LoopEvent::AnswerReady {
            model_calls: 2,
            usage: TokenUsage::default(),
        };
        assert_eq!(done.event_type(), "AnswerReady");
    }
}
