//! Model API request/response types
//!
//! A request carries the whole transcript plus the tool catalog; a response is
//! one assistant turn and the reason the model stopped.

use std::fmt;
use std::ops::AddAssign;

use tracing::debug;

use crate::domain::{ContentBlock, ToolDescriptor, Turn};

/// Everything needed for one model call
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Optional system prompt
    pub system_prompt: Option<String>,

    /// The transcript so far, oldest turn first
    pub turns: Vec<Turn>,

    /// Tools the model may ask for
    pub tools: Vec<ToolDescriptor>,

    /// Max tokens for the response
    pub max_tokens: u32,
}

/// One assistant turn returned by the model
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// Content blocks in the order the model produced them
    pub blocks: Vec<ContentBlock>,

    /// Why the model stopped
    pub stop: StopCondition,

    /// Token usage for this call
    pub usage: TokenUsage,
}

impl ModelTurn {
    /// Create a turn with no usage information
    pub fn new(blocks: Vec<ContentBlock>, stop: StopCondition) -> Self {
        Self {
            blocks,
            stop,
            usage: TokenUsage::default(),
        }
    }

    /// Whether any block asks for a tool
    pub fn has_tool_use(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

/// Why the model ended its turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCondition {
    /// The turn contains tool calls awaiting results
    ToolUseRequested,

    /// The model finished its answer
    NaturalEnd,

    /// Anything else the provider reported, kept verbatim
    Other(String),
}

impl StopCondition {
    /// Parse from Anthropic API stop_reason string
    pub fn from_anthropic(s: &str) -> Self {
        debug!(%s, "StopCondition::from_anthropic: called");
        match s {
            "tool_use" => StopCondition::ToolUseRequested,
            "end_turn" => StopCondition::NaturalEnd,
            other => {
                debug!(%other, "StopCondition::from_anthropic: unrecognized stop reason");
                StopCondition::Other(other.to_string())
            }
        }
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::ToolUseRequested => write!(f, "tool_use_requested"),
            StopCondition::NaturalEnd => write!(f, "natural_end"),
            StopCondition::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_condition_from_anthropic() {
        assert_eq!(StopCondition::from_anthropic("tool_use"), StopCondition::ToolUseRequested);
        assert_eq!(StopCondition::from_anthropic("end_turn"), StopCondition::NaturalEnd);
        assert_eq!(
            StopCondition::from_anthropic("max_tokens"),
            StopCondition::Other("max_tokens".to_string())
        );
        assert_eq!(
            StopCondition::from_anthropic("stop_sequence"),
            StopCondition::Other("stop_sequence".to_string())
        );
    }

    #[test]
    fn test_stop_condition_display() {
        assert_eq!(StopCondition::NaturalEnd.to_string(), "natural_end");
        assert_eq!(StopCondition::Other("refusal".to_string()).to_string(), "refusal");
    }

    #[test]
    fn test_model_turn_has_tool_use() {
        let text_only = ModelTurn::new(vec![ContentBlock::text("4")], StopCondition::NaturalEnd);
        assert!(!text_only.has_tool_use());

        let with_tool = ModelTurn::new(
            vec![ContentBlock::tool_use("c1", "add", serde_json::json!({"a": 2, "b": 3}))],
            StopCondition::ToolUseRequested,
        );
        assert!(with_tool.has_tool_use());
    }

    #[test]
    fn test_token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total += TokenUsage {
            input_tokens: 100,
            output_tokens: 20,
        };
        total += TokenUsage {
            input_tokens: 150,
            output_tokens: 30,
        };
        assert_eq!(total.input_tokens, 250);
        assert_eq!(total.output_tokens, 50);
        assert_eq!(total.total(), 300);
    }
}
