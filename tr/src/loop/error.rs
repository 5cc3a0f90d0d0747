//! Query loop error types

use thiserror::Error;

use crate::llm::LlmError;
use crate::session::SessionError;

/// Errors that end a query
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("Model stopped for an unrecognized reason: {raw}")]
    UnrecognizedStopCondition { raw: String },

    #[error("Model turn is inconsistent with its stop condition: {0}")]
    InconsistentTurn(String),

    #[error("Tool host error: {0}")]
    Session(#[from] SessionError),

    #[error("Query exceeded the limit of {limit} model calls")]
    TurnLimitExceeded { limit: u32 },

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),
}

impl LoopError {
    /// Whether the tool-host session is unusable after this error
    pub fn is_session_fatal(&self) -> bool {
        match self {
            LoopError::Session(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// Violations of the transcript's turn ordering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("An assistant turn must follow a user or tool-results turn")]
    UnexpectedAssistant,

    #[error("Tool results must follow an assistant turn that requested tools")]
    UnexpectedToolResults,

    #[error("Tool results do not match the requested calls: expected {expected:?}, got {actual:?}")]
    ResultsMismatch { expected: Vec<String>, actual: Vec<String> },
}
