//! Tool-host wire protocol
//!
//! JSON-RPC 2.0 over a line-delimited stdio channel, with the MCP method set
//! for the handshake, tool listing and tool calls. Shared by the client side
//! (`session`) and the host side (`host`).

mod jsonrpc;
mod messages;

pub use jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, JsonRpcError, JsonRpcMessage, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
};
pub use messages::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult, ListToolsParams,
    ListToolsResult, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_PING, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    PROTOCOL_VERSION,
};
