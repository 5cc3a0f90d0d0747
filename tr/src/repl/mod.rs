//! Interactive chat shell
//!
//! Reads queries line by line, runs each through the query loop against the
//! connected tool host, and prints tool-use notices and the final answer.

mod shell;

pub use shell::{ChatShell, ShellCommand};

use std::sync::Arc;

use eyre::Result;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::r#loop::QueryLoop;
use crate::session::SessionManager;

/// Run the interactive shell against a connected session
///
/// This is the main entry point for `tr chat`. The session stays owned by the
/// caller, who closes it afterwards.
pub async fn run_interactive(config: &Config, llm: Arc<dyn LlmClient>, session: &SessionManager) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let query_loop = QueryLoop::new(llm, config.loop_config()).with_events(tx);

    let mut shell = ChatShell::new(query_loop, rx, session);
    shell.run().await
}
