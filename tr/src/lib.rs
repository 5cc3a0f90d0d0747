//! toolrelay - let a language model drive a stdio tool host
//!
//! toolrelay launches a tool-host process, speaks JSON-RPC to it over the
//! child's stdin/stdout, and runs user queries through a model that may ask
//! for the host's tools. Tool calls are executed in the order the model asked
//! for them and their results fed back until the model gives its answer.
//!
//! # Modules
//!
//! - [`domain`] - Tool descriptors, invocation results, transcript turns
//! - [`protocol`] - JSON-RPC framing and the tool-host method set
//! - [`session`] - Tool-host connection lifecycle (`SessionManager`)
//! - [`llm`] - Model client trait and Anthropic implementation
//! - [`r#loop`] - The query loop
//! - [`host`] - Serving tools over the protocol (the calculator demo host)
//! - [`repl`] - Interactive chat shell
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod host;
pub mod llm;
pub mod protocol;
pub mod repl;
pub mod session;

// Note: 'loop' is a reserved keyword, so we use r#loop
#[path = "loop/mod.rs"]
pub mod r#loop;

// Re-export commonly used types
pub use config::{AgentConfig, Config, LlmConfig};
pub use domain::{
    ContentBlock, ToolContent, ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, ToolOutcome, ToolOutput,
    Turn,
};
pub use host::{HostTool, ToolServer};
pub use llm::{AnthropicClient, LlmClient, LlmError, ModelRequest, ModelTurn, StopCondition, create_client};
pub use r#loop::{LoopConfig, LoopError, LoopEvent, QueryLoop, Transcript, TranscriptError};
pub use session::{LaunchSpec, SessionError, SessionManager, ToolHost};
