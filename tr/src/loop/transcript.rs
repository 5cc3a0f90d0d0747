//! Transcript - the ordered turns of one query

use tracing::debug;

use super::TranscriptError;
use crate::domain::{ContentBlock, ToolInvocationResult, Turn};

/// Append-only record of one query
///
/// Starts with a single user turn. Assistant turns follow a user or
/// tool-results turn; a tool-results turn answers the preceding assistant
/// turn's tool calls one for one, in the order they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Seed a transcript with the user's query
    pub fn new(query: impl Into<String>) -> Self {
        debug!("Transcript::new: called");
        Self {
            turns: vec![Turn::user(query)],
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Append the model's turn
    pub fn push_assistant(&mut self, blocks: Vec<ContentBlock>) -> Result<(), TranscriptError> {
        debug!(block_count = %blocks.len(), "Transcript::push_assistant: called");
        match self.turns.last() {
            Some(Turn::User { .. }) | Some(Turn::ToolResults { .. }) => {
                self.turns.push(Turn::assistant(blocks));
                Ok(())
            }
            _ => {
                debug!("Transcript::push_assistant: previous turn is not user or tool results");
                Err(TranscriptError::UnexpectedAssistant)
            }
        }
    }

    /// Append results for the preceding assistant turn's tool calls
    pub fn push_tool_results(&mut self, results: Vec<ToolInvocationResult>) -> Result<(), TranscriptError> {
        debug!(result_count = %results.len(), "Transcript::push_tool_results: called");
        let expected: Vec<String> = match self.turns.last() {
            Some(turn @ Turn::Assistant { .. }) => turn.tool_requests().into_iter().map(|r| r.call_id).collect(),
            _ => return Err(TranscriptError::UnexpectedToolResults),
        };
        if expected.is_empty() {
            debug!("Transcript::push_tool_results: assistant turn requested no tools");
            return Err(TranscriptError::UnexpectedToolResults);
        }

        let actual: Vec<String> = results.iter().map(|r| r.call_id.clone()).collect();
        if expected != actual {
            debug!(?expected, ?actual, "Transcript::push_tool_results: call ids do not match");
            return Err(TranscriptError::ResultsMismatch { expected, actual });
        }

        self.turns.push(Turn::tool_results(results));
        Ok(())
    }
}
