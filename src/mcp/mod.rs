//! MCP Gateway Layer
//!
//! The protocol-facing shell of the gateway: JSON-RPC 2.0 message types and
//! the stdio server that exposes `describe_command` and `execute_command`
//! to MCP clients. All security and execution decisions happen below this
//! layer; the gateway only shapes requests and responses.

pub mod protocol;
pub mod server;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult, ToolContent, ToolDescriptor,
    JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
pub use server::GatewayServer;
