//! ToolServer - serves a set of tools over line-delimited JSON-RPC

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::calculator::{AddTool, GreetTool, MultiplyTool};
use super::HostTool;
use crate::domain::ToolDescriptor;
use crate::protocol::{
    CallToolParams, CallToolResult, INVALID_PARAMS, INVALID_REQUEST, Implementation, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, METHOD_INITIALIZE, METHOD_INITIALIZED,
    METHOD_NOT_FOUND, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PARSE_ERROR, PROTOCOL_VERSION,
};

/// Registry of tools plus the request handling for one host
pub struct ToolServer {
    info: Implementation,
    tools: Vec<Box<dyn HostTool>>,
}

impl ToolServer {
    /// Create a server with no tools
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let info = Implementation {
            name: name.into(),
            version: version.into(),
        };
        debug!(name = %info.name, version = %info.version, "ToolServer::new: called");
        Self {
            info,
            tools: Vec::new(),
        }
    }

    /// The simple-calculator host: add, multiply, greet
    pub fn calculator() -> Self {
        let mut server = Self::new("simple-calculator", "0.1.0");
        server.add_tool(Box::new(AddTool));
        server.add_tool(Box::new(MultiplyTool));
        server.add_tool(Box::new(GreetTool));
        server
    }

    /// Register a tool; a tool with the same name is replaced
    pub fn add_tool(&mut self, tool: Box<dyn HostTool>) {
        debug!(tool_name = %tool.name(), "ToolServer::add_tool: called");
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    /// Catalog in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Serve requests until the reader reaches end of input
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(name = %self.info.name, tools = %self.tools.len(), "Tool server started");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(line).await {
                let mut out = serde_json::to_string(&response)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("Tool server input closed, shutting down");
        Ok(())
    }

    /// Handle one line of input; `None` when nothing should be sent back
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "ToolServer::handle_line: parse error");
                return Some(JsonRpcResponse::failure(None, JsonRpcError::new(PARSE_ERROR, "Parse error")));
            }
        };

        if value.get("method").is_none() {
            debug!("ToolServer::handle_line: ignoring response from client");
            return None;
        }

        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "ToolServer::handle_line: invalid request");
                Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ))
            }
        }
    }

    /// Dispatch a parsed request or notification
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "ToolServer::handle: called");
        let Some(id) = request.id else {
            if request.method == METHOD_INITIALIZED {
                info!("Client finished initialization");
            } else {
                debug!(method = %request.method, "ToolServer::handle: ignoring notification");
            }
            return None;
        };

        let outcome = match request.method.as_str() {
            METHOD_INITIALIZE => self.initialize(),
            METHOD_TOOLS_LIST => self.list_tools(),
            METHOD_TOOLS_CALL => self.call_tool(request.params).await,
            METHOD_PING => Ok(serde_json::json!({})),
            other => {
                warn!(method = %other, "ToolServer::handle: method not found");
                Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other)))
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(Some(id), error),
        })
    }

    fn initialize(&self) -> Result<Value, JsonRpcError> {
        info!("Client initializing");
        to_result(&InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({ "tools": {} }),
            server_info: self.info.clone(),
            instructions: None,
        })
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        debug!(tool_count = %self.tools.len(), "ToolServer::list_tools: called");
        to_result(&ListToolsResult {
            tools: self.descriptors(),
            next_cursor: None,
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {}", e)))?;
        debug!(tool_name = %params.name, "ToolServer::call_tool: called");

        let result = match self.tools.iter().find(|t| t.name() == params.name) {
            Some(tool) => tool.execute(params.arguments).await,
            None => {
                warn!(tool_name = %params.name, "ToolServer::call_tool: unknown tool");
                CallToolResult::error(format!("Unknown tool: {}", params.name))
            }
        };
        to_result(&result)
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::new(crate::protocol::INTERNAL_ERROR, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::JsonRpcChannel;
    use serde_json::json;
    use tokio::io::BufReader;

    async fn call(server: &ToolServer, line: &str) -> JsonRpcResponse {
        server.handle_line(line).await.expect("expected a response")
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = ToolServer::calculator();
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
        )
        .await;

        let result: InitializeResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(result.server_info.name, "simple-calculator");
        assert_eq!(result.server_info.version, "0.1.0");
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_list_tools_in_registration_order() {
        let server = ToolServer::calculator();
        let response = call(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;

        let result: ListToolsResult = serde_json::from_value(response.result.unwrap()).unwrap();
        let names: Vec<&str> = result.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["add", "multiply", "greet"]);
        assert!(result.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_call_tool() {
        let server = ToolServer::calculator();
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
        )
        .await;

        assert_eq!(response.id, json!(3));
        let result: CallToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0].to_display_string(), "The sum of 2 and 3 is 5");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let server = ToolServer::calculator();
        let response = call(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"divide","arguments":{}}}"#,
        )
        .await;

        assert!(response.error.is_none());
        let result: CallToolResult = serde_json::from_value(response.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert_eq!(result.content[0].to_display_string(), "Unknown tool: divide");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = ToolServer::calculator();

        let response = call(&server, "{not json").await;
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);
        assert_eq!(response.id, Value::Null);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);

        let response = call(&server, r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{}}"#).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = ToolServer::calculator();
        assert!(
            server
                .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        assert!(server.handle_line(r#"{"jsonrpc":"2.0","id":9,"result":{}}"#).await.is_none());
    }

    #[tokio::test]
    async fn test_serve_over_duplex_with_channel() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);

        let server = tokio::spawn(async move {
            ToolServer::calculator()
                .serve(BufReader::new(server_read), server_write)
                .await
        });

        let mut channel = JsonRpcChannel::new(client_read, client_write);
        let listed = channel.request(METHOD_TOOLS_LIST, None).await.unwrap().unwrap();
        assert_eq!(listed["tools"].as_array().unwrap().len(), 3);

        let called = channel
            .request(
                METHOD_TOOLS_CALL,
                Some(json!({"name": "multiply", "arguments": {"a": 6, "b": 7}})),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(called["content"][0]["text"], "The product of 6 and 7 is 42");

        channel.close().await;
        server.await.unwrap().unwrap();
    }
}
