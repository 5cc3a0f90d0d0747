//! LlmClient trait definition

use async_trait::async_trait;

use super::{LlmError, ModelRequest, ModelTurn};

/// Stateless model client - each call is independent
///
/// The whole transcript travels with every request; the client keeps no
/// conversation state between calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the assistant turn
    async fn complete(&self, request: ModelRequest) -> Result<ModelTurn, LlmError>;

    /// Model identifier, for display and logs
    fn model(&self) -> &str;
}
