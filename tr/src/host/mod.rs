//! Tool-host side of the protocol
//!
//! A small registry of tools served over line-delimited JSON-RPC. The
//! `calchost` binary uses it to expose the calculator tools; tests use it to
//! serve tools in-process.

mod calculator;
mod server;
mod tool;

pub use calculator::{AddTool, GreetTool, MultiplyTool};
pub use server::ToolServer;
pub use tool::HostTool;
