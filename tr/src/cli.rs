//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::session::LaunchSpec;

/// toolrelay - let a language model drive a tool host
#[derive(Parser)]
#[command(
    name = "tr",
    about = "Connect a language model to a stdio tool host and chat with it",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to a tool host and chat interactively
    Chat {
        #[command(flatten)]
        host: HostArgs,
    },

    /// Answer a single query and exit
    Ask {
        /// The query to send to the model
        query: String,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Connect to a tool host and list its tools
    Tools {
        #[command(flatten)]
        host: HostArgs,
    },
}

/// Which tool host to launch
///
/// Falls back to the config file's `host:` section when nothing is given.
#[derive(Debug, Clone, Default, Args)]
pub struct HostArgs {
    /// Run a Python tool-host script
    #[arg(long, value_name = "SCRIPT", conflicts_with = "npx")]
    pub python: Option<String>,

    /// Run a Node tool-host package via npx
    #[arg(long, value_name = "PACKAGE")]
    pub npx: Option<String>,

    /// Extra environment variable for the host (repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,

    /// Host command line after `--`; extra arguments when --python or --npx is given
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl HostArgs {
    /// Build a launch spec from the arguments, if any host was named
    pub fn launch_spec(&self) -> Option<LaunchSpec> {
        debug!(?self, "HostArgs::launch_spec: called");
        let spec = if let Some(script) = &self.python {
            LaunchSpec::python(script).args(&self.command)
        } else if let Some(package) = &self.npx {
            LaunchSpec::npx(package, &self.command)
        } else {
            let (command, args) = self.command.split_first()?;
            LaunchSpec::new(command).args(args)
        };

        Some(
            self.env
                .iter()
                .fold(spec, |spec, (key, value)| spec.env_var(key, value)),
        )
    }
}

fn parse_env_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toolrelay")
        .join("logs")
        .join("toolrelay.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Examples:\n");
    help.push_str("  tr chat --python simple_server.py\n");
    help.push_str("  tr ask \"add 2 and 3\" -- calchost\n");
    help.push_str("  tr tools --npx @modelcontextprotocol/server-filesystem -- /tmp\n");
    help.push('\n');
    help.push_str(&format!("Logs: {}\n", get_log_path().display()));
    help
}
