//! Gateway Tool Layer
//!
//! Exposes the validator and execution engine to MCP clients as two tools
//! over line-delimited JSON-RPC on stdio:
//!
//! - `describe_command`: AWS CLI documentation for a service or command
//! - `execute_command`: validated, rate-limited execution of an AWS CLI
//!   command or pipeline
//!
//! Expected failures of the requested command (validation denials, non-zero
//! exits, timeouts) are returned as tool results with `isError` set, never
//! as protocol errors; protocol errors are reserved for malformed requests.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::exec::{CommandError, CommandExecutor, CommandResult};
use crate::output::format_output;

use super::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallResult, ToolDescriptor,
    MCP_PROTOCOL_VERSION,
};

/// Instructions shown to clients during initialization.
const SERVER_INSTRUCTIONS: &str =
    "Use this server to retrieve AWS CLI documentation and execute AWS CLI commands.";

/// The stdio MCP gateway server.
pub struct GatewayServer {
    executor: Arc<CommandExecutor>,
}

impl GatewayServer {
    pub fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Serve line-delimited JSON-RPC over stdio until EOF.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        let mut stdout = tokio::io::stdout();

        info!("Gateway serving MCP over stdio");

        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read request from stdin")?
        {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) if request.is_notification() => {
                    debug!("Notification received: {}", request.method);
                    continue;
                }
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("Malformed request line: {}", e);
                    JsonRpcResponse::err(
                        Value::Null,
                        JsonRpcError::parse_error(format!("Invalid JSON-RPC request: {e}")),
                    )
                }
            };

            let mut payload =
                serde_json::to_vec(&response).context("Failed to serialize response")?;
            payload.push(b'\n');
            stdout
                .write_all(&payload)
                .await
                .context("Failed to write response to stdout")?;
            stdout.flush().await.context("Failed to flush stdout")?;
        }

        info!("stdin closed, gateway shutting down");
        Ok(())
    }

    /// Dispatch one non-notification request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);
        debug!("Handling request: {}", request.method);

        match request.method.as_str() {
            "initialize" => JsonRpcResponse::ok(id, self.initialize_result()),
            "ping" => JsonRpcResponse::ok(id, json!({})),
            "tools/list" => JsonRpcResponse::ok(id, json!({ "tools": tool_descriptors() })),
            "tools/call" => self.handle_tool_call(id, request.params).await,
            method => JsonRpcResponse::err(id, JsonRpcError::method_not_found(method)),
        }
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "awsgate",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "instructions": SERVER_INSTRUCTIONS,
        })
    }

    async fn handle_tool_call(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::err(id, JsonRpcError::invalid_params("Missing params"));
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::err(id, JsonRpcError::invalid_params("Missing tool name"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match name {
            "describe_command" => self.call_describe_command(id, &arguments).await,
            "execute_command" => self.call_execute_command(id, &arguments).await,
            other => JsonRpcResponse::err(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {other}")),
            ),
        }
    }

    async fn call_describe_command(&self, id: Value, arguments: &Value) -> JsonRpcResponse {
        let Some(service) = arguments.get("service").and_then(Value::as_str) else {
            return JsonRpcResponse::err(
                id,
                JsonRpcError::invalid_params("describe_command requires a 'service' argument"),
            );
        };
        let command = arguments.get("command").and_then(Value::as_str);

        info!(
            "Getting documentation for service: {}, command: {}",
            service,
            command.unwrap_or("None")
        );
        let help = self.executor.get_help(service, command).await;
        tool_response(id, ToolCallResult::text(help.help_text, false))
    }

    async fn call_execute_command(&self, id: Value, arguments: &Value) -> JsonRpcResponse {
        let Some(command) = arguments.get("command").and_then(Value::as_str) else {
            return JsonRpcResponse::err(
                id,
                JsonRpcError::invalid_params("execute_command requires a 'command' argument"),
            );
        };
        let timeout = arguments.get("timeout").and_then(Value::as_u64);

        info!("Executing command: {}", command);
        let result = match self.executor.run(command, timeout).await {
            Ok(result) if result.is_success() => {
                CommandResult::success(format_output(&result.output))
            }
            Ok(result) => result,
            Err(CommandError::Validation(e)) => {
                warn!("Command validation error: {}", e);
                CommandResult::error(format!("Command validation error: {e}"))
            }
            Err(CommandError::Execution(e)) => {
                warn!("Command execution error: {}", e);
                CommandResult::error(format!("Command execution error: {e}"))
            }
        };

        let is_error = !result.is_success();
        tool_response(id, ToolCallResult::text(result.output, is_error))
    }
}

fn tool_response(id: Value, result: ToolCallResult) -> JsonRpcResponse {
    match serde_json::to_value(&result) {
        Ok(value) => JsonRpcResponse::ok(id, value),
        Err(e) => JsonRpcResponse::err(id, JsonRpcError::internal(e.to_string())),
    }
}

/// The two tools this gateway advertises.
fn tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "describe_command".to_string(),
            description: "Get AWS CLI documentation for a service or a command within a service"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service": {
                        "type": "string",
                        "description": "AWS service (e.g., s3, ec2)",
                    },
                    "command": {
                        "type": "string",
                        "description": "Command within the service (optional)",
                    },
                },
                "required": ["service"],
            }),
        },
        ToolDescriptor {
            name: "execute_command".to_string(),
            description: "Execute an AWS CLI command, optionally piped through allowed Unix \
                          utilities"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Complete AWS CLI command to execute (must start with 'aws')",
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds (optional)",
                    },
                },
                "required": ["command"],
            }),
        },
    ]
}
