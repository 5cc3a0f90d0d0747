//! Conversation turns and assistant content blocks

use serde_json::Value;
use tracing::debug;

use super::tool::{ToolInvocationRequest, ToolInvocationResult};

/// A block inside an assistant turn
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },
}

impl ContentBlock {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create a tool-use content block
    pub fn tool_use(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        ContentBlock::ToolUse {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// The invocation request carried by a tool-use block
    pub fn as_tool_request(&self) -> Option<ToolInvocationRequest> {
        match self {
            ContentBlock::ToolUse {
                call_id,
                tool_name,
                arguments,
            } => Some(ToolInvocationRequest {
                call_id: call_id.clone(),
                tool_name: tool_name.clone(),
                arguments: arguments.clone(),
            }),
            ContentBlock::Text { .. } => None,
        }
    }
}

/// One unit of the transcript
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    User { content: String },
    Assistant { blocks: Vec<ContentBlock> },
    ToolResults { results: Vec<ToolInvocationResult> },
}

impl Turn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        debug!("Turn::user: called");
        Turn::User {
            content: content.into(),
        }
    }

    /// Create an assistant turn
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        debug!(block_count = %blocks.len(), "Turn::assistant: called");
        Turn::Assistant { blocks }
    }

    /// Create a tool results turn
    pub fn tool_results(results: Vec<ToolInvocationResult>) -> Self {
        debug!(result_count = %results.len(), "Turn::tool_results: called");
        Turn::ToolResults { results }
    }

    /// Tool calls requested by this turn, in emission order
    ///
    /// Empty for anything but an assistant turn.
    pub fn tool_requests(&self) -> Vec<ToolInvocationRequest> {
        match self {
            Turn::Assistant { blocks } => blocks.iter().filter_map(ContentBlock::as_tool_request).collect(),
            Turn::User { .. } | Turn::ToolResults { .. } => Vec::new(),
        }
    }

    /// Concatenation, in block order, of every text block
    pub fn text(&self) -> String {
        match self {
            Turn::User { content } => content.clone(),
            Turn::Assistant { blocks } => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ToolUse { .. } => None,
                })
                .collect(),
            Turn::ToolResults { .. } => String::new(),
        }
    }
}
