//! Subprocess transport for a tool host

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::channel::JsonRpcChannel;
use super::{LaunchSpec, SessionError};

/// How long a host gets to exit on its own after its input is closed
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// A spawned tool-host process and the channel over its stdio
pub struct StdioTransport {
    child: Child,
    channel: Option<JsonRpcChannel>,
}

impl StdioTransport {
    /// Spawn the process described by `spec`
    ///
    /// stdin/stdout carry the protocol; stderr is passed through. The child is
    /// killed if the transport is dropped without `shutdown`.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, SessionError> {
        debug!(%spec, "StdioTransport::spawn: called");
        let mut command = Command::new(&spec.command);
        command
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(env) = &spec.env {
            debug!(count = %env.len(), "StdioTransport::spawn: applying env overrides");
            command.envs(env);
        }

        let mut child = command.spawn().map_err(|e| SessionError::Connection {
            command: spec.command.clone(),
            reason: format!("Failed to start process: {}", e),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| SessionError::Connection {
            command: spec.command.clone(),
            reason: "Child stdin was not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SessionError::Connection {
            command: spec.command.clone(),
            reason: "Child stdout was not captured".to_string(),
        })?;

        info!(pid = ?child.id(), %spec, "Started tool host");
        Ok(Self {
            child,
            channel: Some(JsonRpcChannel::new(stdout, stdin)),
        })
    }

    /// The live channel, or `NotConnected` once released
    pub fn channel(&mut self) -> Result<&mut JsonRpcChannel, SessionError> {
        self.channel.as_mut().ok_or(SessionError::NotConnected)
    }

    /// OS process id, while the process is running
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Describe how the process exited, if it already has
    pub fn exit_hint(&mut self) -> Option<String> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(format!("process exited with {}", status)),
            Ok(None) => None,
            Err(e) => Some(format!("process state unknown: {}", e)),
        }
    }

    /// Release the channel, then terminate the process
    pub async fn shutdown(&mut self) {
        debug!(pid = ?self.child.id(), "StdioTransport::shutdown: called");
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                info!(%status, "Tool host exited");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to wait for tool host, killing it");
                self.kill().await;
            }
            Err(_) => {
                warn!(grace_ms = %SHUTDOWN_GRACE.as_millis(), "Tool host did not exit in time, killing it");
                self.kill().await;
            }
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "Failed to kill tool host");
        }
    }
}
