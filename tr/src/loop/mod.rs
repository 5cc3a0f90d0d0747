//! Query loop module
//!
//! Runs one user query to completion: model call, tool calls, model call again,
//! until the model ends its turn. The transcript for a query lives only as long
//! as the query.

mod config;
mod engine;
mod error;
mod events;
mod transcript;

pub use config::LoopConfig;
pub use engine::QueryLoop;
pub use error::{LoopError, TranscriptError};
pub use events::LoopEvent;
pub use transcript::Transcript;
