//! Domain types shared by the session, model client and query loop
//!
//! Tool descriptors and invocation results come from the tool host; turns and
//! content blocks make up a query's transcript.

mod tool;
mod turn;

pub use tool::{
    ToolContent, ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, ToolOutcome, ToolOutput,
};
pub use turn::{ContentBlock, Turn};
