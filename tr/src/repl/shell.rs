//! Chat shell session

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::r#loop::{LoopEvent, QueryLoop};
use crate::session::SessionManager;

const RULE_WIDTH: usize = 60;

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Blank line
    Empty,
    /// Leave the shell
    Quit,
    /// Show the tool catalog
    Tools,
    /// Show help
    Help,
    /// Unrecognized slash command
    Unknown(String),
    /// A query for the model
    Query(String),
}

impl ShellCommand {
    /// Classify one line of input
    pub fn parse(line: &str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return ShellCommand::Empty;
        }

        match input.to_lowercase().as_str() {
            "quit" | "exit" | "q" => return ShellCommand::Quit,
            _ => {}
        }

        if !input.starts_with('/') {
            return ShellCommand::Query(input.to_string());
        }

        let cmd = input.split_whitespace().next().unwrap_or("");
        match cmd {
            "/quit" | "/q" | "/exit" => ShellCommand::Quit,
            "/tools" | "/t" => ShellCommand::Tools,
            "/help" | "/h" => ShellCommand::Help,
            _ => ShellCommand::Unknown(cmd.to_string()),
        }
    }
}

/// Interactive shell bound to one connected session
pub struct ChatShell<'a> {
    query_loop: QueryLoop,
    events: mpsc::UnboundedReceiver<LoopEvent>,
    session: &'a SessionManager,
}

impl<'a> ChatShell<'a> {
    /// Create a shell; `events` must be the receiver for `query_loop`'s event sender
    pub fn new(query_loop: QueryLoop, events: mpsc::UnboundedReceiver<LoopEvent>, session: &'a SessionManager) -> Self {
        Self {
            query_loop,
            events,
            session,
        }
    }

    /// Run the shell main loop until the user quits or the session dies
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", "You:".bright_green()));

            match readline {
                Ok(line) => {
                    let command = ShellCommand::parse(&line);
                    debug!(?command, "ChatShell::run: parsed input");

                    match command {
                        ShellCommand::Empty => continue,
                        ShellCommand::Quit => break,
                        ShellCommand::Tools => self.print_tools(),
                        ShellCommand::Help => self.print_help(),
                        ShellCommand::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                            println!("Type {} for available commands", "/help".yellow());
                        }
                        ShellCommand::Query(query) => {
                            let _ = rl.add_history_entry(query.as_str());
                            self.process_query(&query).await?;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("\nGoodbye!");
        Ok(())
    }

    /// Run one query, printing progress as it happens
    ///
    /// Query errors are reported and the shell keeps going, unless the tool
    /// host is gone.
    async fn process_query(&mut self, query: &str) -> Result<()> {
        print_rule();
        println!("{} {}", "User Query:".bright_cyan(), query);
        print_rule();
        println!();

        let result = {
            let running = self.query_loop.process_query(self.session, query);
            tokio::pin!(running);
            loop {
                tokio::select! {
                    result = &mut running => break result,
                    Some(event) = self.events.recv() => print_event(&event),
                }
            }
        };
        while let Ok(event) = self.events.try_recv() {
            print_event(&event);
        }

        match result {
            Ok(answer) => {
                println!();
                print_rule();
                println!("{}", "Response:".bright_cyan());
                print_rule();
                println!("{}", answer);
                print_rule();
                println!();
                Ok(())
            }
            Err(e) if e.is_session_fatal() => {
                warn!(error = %e, "Tool host session lost");
                println!("{} {}", "Error:".red(), e);
                Err(eyre::eyre!("Tool host session lost: {}", e))
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                println!("{} {}", "Error:".red(), e);
                println!();
                Ok(())
            }
        }
    }

    fn print_welcome(&self) {
        println!();
        print_rule();
        println!("{}", "toolrelay chat - type your queries (or 'quit' to exit)".bright_cyan().bold());
        if let Some(server) = self.session.server_info() {
            println!("Connected to {} {}", server.name.bright_white(), server.version);
        }
        if let Some(instructions) = self.session.server_instructions() {
            println!("{}", instructions.dimmed());
        }
        println!("Type {} for help, {} to list tools", "/help".yellow(), "/tools".yellow());
        print_rule();
        println!();
    }

    fn print_tools(&self) {
        let tools = self.session.cached_catalog().unwrap_or_default();
        println!();
        println!("{} ({})", "Available Tools:".bright_cyan(), tools.len());
        for tool in &tools {
            println!("  {:14} {}", tool.name.yellow(), tool.description);
        }
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} List the tool host's tools", "/tools".yellow());
        println!("  {:14} Exit (also: quit, exit, q)", "/quit".yellow());
        println!();
        println!("Anything else is sent to the model as a query.");
        println!();
    }
}

fn print_rule() {
    println!("{}", "=".repeat(RULE_WIDTH));
}

fn print_event(event: &LoopEvent) {
    match event {
        LoopEvent::ToolCallStarted {
            tool_name, arguments, ..
        } => {
            println!("{} {}", "Using tool:".bright_yellow(), tool_name.bright_white());
            println!("   {} {}", "Arguments:".dimmed(), arguments);
        }
        LoopEvent::ToolCallFinished {
            tool_name,
            is_error: true,
            ..
        } => {
            println!("   {} {} reported an error", "!".red(), tool_name);
        }
        LoopEvent::AnswerReady { model_calls, usage } => {
            let summary = format!("({} model calls, {} tokens)", model_calls, usage.total());
            println!("   {}", summary.dimmed());
        }
        LoopEvent::ModelCallStarted { .. } | LoopEvent::ToolCallFinished { .. } => {}
    }
}
