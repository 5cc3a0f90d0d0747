//! Tool-host session management
//!
//! A `SessionManager` owns exactly one tool-host subprocess: it spawns it,
//! performs the handshake, lists and calls tools over the stdio channel, and
//! terminates it on `close()`. The query loop only sees it through the
//! `ToolHost` trait.

mod channel;
mod error;
mod launch;
mod manager;
mod transport;

pub use channel::JsonRpcChannel;
pub use error::SessionError;
pub use launch::LaunchSpec;
pub use manager::SessionManager;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{ToolDescriptor, ToolOutput};

/// What the query loop needs from a tool host
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Fetch the current catalog from the host
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError>;

    /// Execute one tool call
    async fn invoke_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError>;

    /// The most recently fetched catalog, without a round trip
    fn cached_catalog(&self) -> Option<Vec<ToolDescriptor>>;
}
