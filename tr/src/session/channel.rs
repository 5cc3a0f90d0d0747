//! Line-delimited JSON-RPC channel
//!
//! Writes one request, then reads lines until the response with the matching
//! id arrives. Only one request is ever outstanding on a channel.

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::protocol::{
    JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, METHOD_PING,
};

use super::SessionError;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Client end of a JSON-RPC connection
pub struct JsonRpcChannel {
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
    next_id: u64,
}

impl JsonRpcChannel {
    /// Wrap a reader (host output) and writer (host input)
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
            next_id: 1,
        }
    }

    /// Send a request and wait for its response
    ///
    /// The outer error is a channel fault; the inner one is the error object
    /// the host answered with.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Result<Value, JsonRpcError>, SessionError> {
        let id = self.next_id;
        self.next_id += 1;
        debug!(%id, %method, "JsonRpcChannel::request: called");

        self.write_message(&JsonRpcRequest::new(id, method, params)).await?;

        loop {
            let line = self.read_line().await?;
            let message = match JsonRpcMessage::parse(&line) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "JsonRpcChannel::request: skipping line that is not JSON-RPC");
                    continue;
                }
            };

            match message {
                JsonRpcMessage::Response(response) => {
                    if response.id != Value::from(id) {
                        warn!(expected = %id, got = %response.id, "JsonRpcChannel::request: response for unknown request ID");
                        continue;
                    }
                    if let Some(error) = response.error {
                        debug!(%id, %error, "JsonRpcChannel::request: error response");
                        return Ok(Err(error));
                    }
                    debug!(%id, "JsonRpcChannel::request: success response");
                    return Ok(Ok(response.result.unwrap_or(Value::Null)));
                }
                JsonRpcMessage::Notification(notification) => {
                    debug!(method = %notification.method, "JsonRpcChannel::request: received notification");
                }
                JsonRpcMessage::Request(request) => {
                    self.answer_host_request(request).await?;
                }
            }
        }
    }

    /// Send a notification (no response expected)
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        debug!(%method, "JsonRpcChannel::notify: called");
        self.write_message(&JsonRpcRequest::notification(method, params)).await
    }

    /// Close our write half so the host sees end of input
    pub async fn close(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!(error = %e, "JsonRpcChannel::close: shutdown failed");
        }
    }

    /// Host-initiated requests: answer pings, refuse everything else
    async fn answer_host_request(&mut self, request: JsonRpcRequest) -> Result<(), SessionError> {
        let id = request.id.unwrap_or_default();
        let response = if request.method == METHOD_PING {
            debug!("JsonRpcChannel::answer_host_request: ping");
            JsonRpcResponse::success(id, serde_json::json!({}))
        } else {
            warn!(method = %request.method, "JsonRpcChannel::answer_host_request: unsupported host request");
            JsonRpcResponse::failure(
                Some(id),
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", request.method)),
            )
        };
        self.write_message(&response).await
    }

    async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<(), SessionError> {
        let mut line = serde_json::to_string(message)
            .map_err(|e| SessionError::Protocol(format!("Failed to serialize message: {}", e)))?;
        line.push('\n');

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| SessionError::Transport(format!("Failed to write to tool host: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| SessionError::Transport(format!("Failed to flush tool host input: {}", e)))
    }

    async fn read_line(&mut self) -> Result<String, SessionError> {
        loop {
            let mut line = String::new();
            let bytes_read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| SessionError::Transport(format!("Failed to read from tool host: {}", e)))?;

            if bytes_read == 0 {
                return Err(SessionError::Transport("Tool host closed the connection".to_string()));
            }

            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    /// Read one request line from the client side and reply with `reply`
    async fn reply_once(host: &mut BufReader<tokio::io::DuplexStream>, reply: &str) -> Value {
        let mut line = String::new();
        host.read_line(&mut line).await.unwrap();
        host.get_mut().write_all(reply.as_bytes()).await.unwrap();
        host.get_mut().write_all(b"\n").await.unwrap();
        serde_json::from_str(&line).unwrap()
    }

    fn channel_pair() -> (JsonRpcChannel, BufReader<tokio::io::DuplexStream>) {
        let (client, host) = duplex(64 * 1024);
        let (read, write) = tokio::io::split(client);
        (JsonRpcChannel::new(read, write), BufReader::new(host))
    }

    #[tokio::test]
    async fn test_request_returns_result() {
        let (mut channel, mut host) = channel_pair();

        let host_task = tokio::spawn(async move {
            reply_once(&mut host, r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).await
        });

        let result = channel.request("tools/list", None).await.unwrap().unwrap();
        assert_eq!(result["tools"], serde_json::json!([]));

        let sent = host_task.await.unwrap();
        assert_eq!(sent["method"], "tools/list");
        assert_eq!(sent["id"], 1);
    }

    #[tokio::test]
    async fn test_request_surfaces_error_object() {
        let (mut channel, mut host) = channel_pair();

        tokio::spawn(async move {
            reply_once(
                &mut host,
                r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
            )
            .await
        });

        let error = channel.request("bogus", None).await.unwrap().unwrap_err();
        assert_eq!(error.code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_skips_notifications_and_stale_ids() {
        let (mut channel, mut host) = channel_pair();

        tokio::spawn(async move {
            let mut line = String::new();
            host.read_line(&mut line).await.unwrap();
            let lines = concat!(
                "starting server...\n",
                r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":99,"result":{}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#,
                "\n"
            );
            host.get_mut().write_all(lines.as_bytes()).await.unwrap();
        });

        let result = channel.request("ping", None).await.unwrap().unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn test_request_on_closed_host_is_transport_error() {
        let (mut channel, host) = channel_pair();
        drop(host);

        let err = channel.request("tools/list", None).await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[tokio::test]
    async fn test_host_ping_is_answered() {
        let (mut channel, mut host) = channel_pair();

        let host_task = tokio::spawn(async move {
            let mut line = String::new();
            host.read_line(&mut line).await.unwrap();
            host.get_mut()
                .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":500,\"method\":\"ping\"}\n")
                .await
                .unwrap();

            let mut pong = String::new();
            host.read_line(&mut pong).await.unwrap();
            host.get_mut()
                .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n")
                .await
                .unwrap();
            serde_json::from_str::<Value>(&pong).unwrap()
        });

        channel.request("tools/list", None).await.unwrap().unwrap();
        let pong = host_task.await.unwrap();
        assert_eq!(pong["id"], 500);
        assert!(pong.get("result").is_some());
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let (mut channel, mut host) = channel_pair();

        let host_task = tokio::spawn(async move {
            let first = reply_once(&mut host, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).await;
            let second = reply_once(&mut host, r#"{"jsonrpc":"2.0","id":2,"result":{}}"#).await;
            (first, second)
        });

        channel.request("a", None).await.unwrap().unwrap();
        channel.request("b", None).await.unwrap().unwrap();

        let (first, second) = host_task.await.unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }
}
