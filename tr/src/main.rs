//! toolrelay - connect a language model to a stdio tool host
//!
//! CLI entry point for chatting with, querying, and inspecting tool hosts.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

use toolrelay::cli::{Cli, Command, HostArgs, generate_after_help, get_log_path};
use toolrelay::config::Config;
use toolrelay::domain::ToolDescriptor;
use toolrelay::llm::create_client;
use toolrelay::r#loop::{LoopEvent, QueryLoop};
use toolrelay::repl;
use toolrelay::session::{LaunchSpec, SessionManager};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help that shows the log location
    let cmd = Cli::command().after_help(generate_after_help());

    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "toolrelay loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Chat { host } => cmd_chat(&config, &host).await,
        Command::Ask { query, host } => cmd_ask(&config, &query, &host).await,
        Command::Tools { host } => cmd_tools(&config, &host).await,
    }
}

/// Pick the host from the command line, else from the config file
fn resolve_host(config: &Config, args: &HostArgs) -> Result<LaunchSpec> {
    args.launch_spec().or_else(|| config.host.clone()).ok_or_else(|| {
        eyre::eyre!(
            "No tool host given. Use --python SCRIPT, --npx PACKAGE or -- COMMAND ARGS..., \
             or set a host: section in the config file"
        )
    })
}

/// Launch the host and complete the handshake
async fn connect(config: &Config, args: &HostArgs) -> Result<(SessionManager, Vec<ToolDescriptor>)> {
    let spec = resolve_host(config, args)?;
    debug!(%spec, "connect: resolved host");

    let mut session = SessionManager::new();
    let tools = session
        .connect(&spec)
        .await
        .context(format!("Failed to connect to tool host '{}'", spec))?;
    Ok((session, tools))
}

fn print_catalog(tools: &[ToolDescriptor]) {
    println!("\nConnected to server with {} tools:", tools.len());
    for tool in tools {
        println!("  - {}: {}", tool.name.bright_white(), tool.description);
    }
}

async fn cmd_chat(config: &Config, host: &HostArgs) -> Result<()> {
    debug!("cmd_chat: called");
    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let (mut session, tools) = connect(config, host).await?;
    print_catalog(&tools);

    let result = repl::run_interactive(config, llm, &session).await;
    session.close().await;
    result
}

async fn cmd_ask(config: &Config, query: &str, host: &HostArgs) -> Result<()> {
    debug!(%query, "cmd_ask: called");
    config.validate()?;
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let (mut session, _tools) = connect(config, host).await?;

    // Tool notices go to stderr so stdout carries only the answer
    let (tx, mut rx) = mpsc::unbounded_channel();
    let notices = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let LoopEvent::ToolCallStarted {
                tool_name, arguments, ..
            } = event
            {
                eprintln!("{} {} {}", "Using tool:".bright_yellow(), tool_name, arguments);
            }
        }
    });

    let query_loop = QueryLoop::new(llm, config.loop_config()).with_events(tx);
    let result = query_loop.process_query(&session, query).await;
    session.close().await;

    drop(query_loop);
    let _ = notices.await;

    let answer = result.context("Query failed")?;
    println!("{}", answer);
    Ok(())
}

async fn cmd_tools(config: &Config, host: &HostArgs) -> Result<()> {
    debug!("cmd_tools: called");
    let (mut session, tools) = connect(config, host).await?;

    if let Some(server) = session.server_info() {
        println!("{} {}", server.name.bright_cyan(), server.version);
    }
    print_catalog(&tools);

    session.close().await;
    Ok(())
}
