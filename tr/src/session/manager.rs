//! SessionManager - owns one connection to one tool host

use std::collections::HashSet;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{ToolDescriptor, ToolOutput};
use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult, ListToolsParams,
    ListToolsResult, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};

use super::transport::StdioTransport;
use super::{LaunchSpec, SessionError, ToolHost};

/// Live connection state
struct Session {
    command: String,
    transport: Mutex<StdioTransport>,
    server: Option<InitializeResult>,
    catalog: StdMutex<Vec<ToolDescriptor>>,
}

/// Establishes, uses and tears down one tool-host connection
///
/// All requests go through one async mutex, so at most one is in flight.
/// Call `close()` on every exit path; dropping a connected manager still kills
/// the subprocess.
pub struct SessionManager {
    client_info: Implementation,
    session: Option<Session>,
}

impl SessionManager {
    /// Create a manager that introduces itself as this crate
    pub fn new() -> Self {
        Self::with_client_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Create a manager with a custom client name/version for the handshake
    pub fn with_client_info(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            client_info: Implementation {
                name: name.into(),
                version: version.into(),
            },
            session: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Name and version the host declared during the handshake
    pub fn server_info(&self) -> Option<&Implementation> {
        self.session
            .as_ref()
            .and_then(|s| s.server.as_ref())
            .map(|s| &s.server_info)
    }

    /// Usage instructions the host sent during the handshake, if any
    pub fn server_instructions(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|s| s.server.as_ref())
            .and_then(|s| s.instructions.as_deref())
    }

    /// Start the host, perform the handshake and fetch the catalog
    ///
    /// On any failure the partially started host is released before the
    /// error is returned.
    pub async fn connect(&mut self, spec: &LaunchSpec) -> Result<Vec<ToolDescriptor>, SessionError> {
        info!(%spec, "Connecting to tool host");
        if self.session.is_some() {
            debug!("connect: already connected");
            return Err(SessionError::AlreadyConnected);
        }

        let transport = StdioTransport::spawn(spec)?;
        self.session = Some(Session {
            command: spec.command.clone(),
            transport: Mutex::new(transport),
            server: None,
            catalog: StdMutex::new(Vec::new()),
        });

        match self.handshake().await {
            Ok(tools) => {
                info!(tool_count = %tools.len(), server = ?self.server_info(), "Connected to tool host");
                Ok(tools)
            }
            Err(e) => {
                warn!(error = %e, "connect: handshake failed, releasing tool host");
                self.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> Result<Vec<ToolDescriptor>, SessionError> {
        let params = serde_json::to_value(InitializeParams::new(&self.client_info.name, &self.client_info.version))
            .map_err(|e| SessionError::Protocol(format!("Failed to encode initialize params: {}", e)))?;

        let session = self.session.as_mut().ok_or(SessionError::NotConnected)?;
        let command = session.command.clone();

        let server = {
            let mut transport = session.transport.lock().await;
            let outcome = transport.channel()?.request(METHOD_INITIALIZE, Some(params)).await;
            let reply = match outcome {
                Ok(reply) => reply,
                Err(e) => return Err(incomplete_handshake(e, &command, transport.exit_hint())),
            };

            let value = reply.map_err(|e| SessionError::Protocol(format!("Host rejected initialize: {}", e)))?;
            let server: InitializeResult = serde_json::from_value(value)
                .map_err(|e| SessionError::Protocol(format!("Malformed initialize response: {}", e)))?;
            debug!(protocol_version = %server.protocol_version, "handshake: initialize accepted");

            let notified = transport.channel()?.notify(METHOD_INITIALIZED, None).await;
            if let Err(e) = notified {
                return Err(incomplete_handshake(e, &command, transport.exit_hint()));
            }
            server
        };
        session.server = Some(server);

        self.list_tools()
            .await
            .map_err(|e| incomplete_handshake(e, &command, None))
    }

    /// Re-query the host's catalog, following pagination
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        debug!("list_tools: called");
        let session = self.session.as_ref().ok_or(SessionError::NotConnected)?;
        let mut transport = session.transport.lock().await;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen = HashSet::new();
        loop {
            let params = serde_json::to_value(ListToolsParams { cursor: cursor.take() })
                .map_err(|e| SessionError::Protocol(format!("Failed to encode tools/list params: {}", e)))?;
            let value = transport
                .channel()?
                .request(METHOD_TOOLS_LIST, Some(params))
                .await?
                .map_err(|e| SessionError::Protocol(format!("Host rejected tools/list: {}", e)))?;
            let page: ListToolsResult = serde_json::from_value(value)
                .map_err(|e| SessionError::Protocol(format!("Malformed tools/list response: {}", e)))?;

            debug!(page_size = %page.tools.len(), "list_tools: received page");
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !seen.insert(next.clone()) => {
                    warn!(cursor = %next, "list_tools: host repeated a pagination cursor");
                    return Err(SessionError::Protocol(format!(
                        "tools/list pagination repeated cursor '{}'",
                        next
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        *session.catalog.lock().unwrap_or_else(|e| e.into_inner()) = tools.clone();
        Ok(tools)
    }

    /// The catalog from the most recent listing
    pub fn cached_catalog(&self) -> Option<Vec<ToolDescriptor>> {
        self.session
            .as_ref()
            .map(|s| s.catalog.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    /// Call a tool on the host and wait for its result
    ///
    /// The name is not checked against the catalog; the host reports unknown
    /// tools itself.
    pub async fn invoke_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError> {
        debug!(%name, "invoke_tool: called");
        let session = self.session.as_ref().ok_or(SessionError::NotConnected)?;

        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| SessionError::Protocol(format!("Failed to encode tools/call params: {}", e)))?;

        let reply = {
            let mut transport = session.transport.lock().await;
            transport.channel()?.request(METHOD_TOOLS_CALL, Some(params)).await?
        };

        let value = reply.map_err(|e| SessionError::ToolExecution {
            name: name.to_string(),
            detail: e.message,
        })?;
        let result: CallToolResult = serde_json::from_value(value)
            .map_err(|e| SessionError::Protocol(format!("Malformed tools/call response for '{}': {}", name, e)))?;

        let output = ToolOutput::new(result.content);
        if result.is_error {
            debug!(%name, "invoke_tool: host reported tool error");
            return Err(SessionError::ToolExecution {
                name: name.to_string(),
                detail: output.to_display_string(),
            });
        }

        debug!(%name, items = %output.content.len(), "invoke_tool: success");
        Ok(output)
    }

    /// Release the transport and terminate the host
    ///
    /// Idempotent; a no-op when not connected.
    pub async fn close(&mut self) {
        let Some(session) = self.session.take() else {
            debug!("close: not connected");
            return;
        };

        let mut transport = session.transport.into_inner();
        let pid = transport.pid();
        transport.shutdown().await;
        info!(?pid, command = %session.command, "Closed tool host session");
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            warn!(command = %session.command, "SessionManager dropped without close, killing tool host");
        }
    }
}

/// A handshake that stopped short is a connection failure, not a transport one
fn incomplete_handshake(err: SessionError, command: &str, exit_hint: Option<String>) -> SessionError {
    match err {
        SessionError::Transport(reason) => SessionError::Connection {
            command: command.to_string(),
            reason: match exit_hint {
                Some(hint) => format!("Handshake did not complete: {} ({})", reason, hint),
                None => format!("Handshake did not complete: {}", reason),
            },
        },
        other => other,
    }
}

#[async_trait]
impl ToolHost for SessionManager {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, SessionError> {
        SessionManager::list_tools(self).await
    }

    async fn invoke_tool(&self, name: &str, arguments: Value) -> Result<ToolOutput, SessionError> {
        SessionManager::invoke_tool(self, name, arguments).await
    }

    fn cached_catalog(&self) -> Option<Vec<ToolDescriptor>> {
        SessionManager::cached_catalog(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_tools_before_connect() {
        let manager = SessionManager::new();
        let err = manager.list_tools().await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn test_invoke_tool_before_connect() {
        let manager = SessionManager::new();
        let err = manager
            .invoke_tool("add", serde_json::json!({"a": 1, "b": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn test_close_without_connect_is_noop() {
        let mut manager = SessionManager::new();
        manager.close().await;
        manager.close().await;
        assert!(!manager.is_connected());
        assert!(manager.cached_catalog().is_none());
    }

    #[tokio::test]
    async fn test_connect_missing_executable() {
        let mut manager = SessionManager::new();
        let spec = LaunchSpec::new("/nonexistent/toolrelay-test-host");

        let err = manager.connect(&spec).await.unwrap_err();
        assert!(matches!(err, SessionError::Connection { ref command, .. } if command == "/nonexistent/toolrelay-test-host"));
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_incomplete_handshake_maps_transport() {
        let err = incomplete_handshake(
            SessionError::Transport("Tool host closed the connection".to_string()),
            "python",
            Some("process exited with exit status: 1".to_string()),
        );
        match err {
            SessionError::Connection { command, reason } => {
                assert_eq!(command, "python");
                assert!(reason.contains("exit status: 1"));
            }
            other => panic!("Expected Connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_handshake_keeps_protocol_errors() {
        let err = incomplete_handshake(SessionError::Protocol("bad".to_string()), "python", None);
        assert!(matches!(err, SessionError::Protocol(_)));
    }
}
