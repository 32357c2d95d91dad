//! Gateway RPC message types
//!
//! The MCP server and the gateway daemon speak JSON-RPC 2.0 over the
//! gateway's stdio, one message per line. Besides the lifecycle methods
//! (`initialize`, `shutdown`), everything goes through `execute`, which
//! names an operation and carries a structured input object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string carried on every message
pub const JSONRPC_VERSION: &str = "2.0";

/// Lifecycle: handshake after the gateway process starts
pub const METHOD_INITIALIZE: &str = "initialize";
/// Lifecycle: stop discovery, drop subscriptions, exit the RPC loop
pub const METHOD_SHUTDOWN: &str = "shutdown";
/// Dispatch a named operation with a structured input
pub const METHOD_EXECUTE: &str = "execute";

// Operation names understood by the gateway's `execute` method.
pub const OP_SESSION_INFO: &str = "session_info";
pub const OP_START_DISCOVERY: &str = "start_discovery";
pub const OP_STOP_DISCOVERY: &str = "stop_discovery";
pub const OP_GET_TOPICS: &str = "get_topics";
pub const OP_SUBSCRIBE: &str = "subscribe";
pub const OP_UNSUBSCRIBE: &str = "unsubscribe";
pub const OP_POLL: &str = "poll";
pub const OP_LIST_SUBSCRIPTIONS: &str = "list_subscriptions";

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID, assigned by the caller
    pub id: u64,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// Create a request with no parameters
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.into(),
            params: Value::Null,
        }
    }

    /// Create an `execute` request for a named operation
    pub fn execute(id: u64, operation: &str, input: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: METHOD_EXECUTE.into(),
            params: serde_json::json!({
                "operation": operation,
                "input": input,
            }),
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID this response answers
    pub id: u64,
    /// Result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
}

impl RpcError {
    /// Create a new RPC error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Parse error: Invalid JSON was received
    pub const PARSE_ERROR: i64 = -32700;
    /// Invalid Request: The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// An operation handler failed
    pub const OPERATION_FAILED: i64 = -32000;
}

/// The effective payload of a successful operation response.
///
/// Historically the gateway wrapped payloads in a `{success, data, message}`
/// envelope while some responses carried the payload directly. Rather than
/// re-guessing `data`-or-raw at every call site, the ambiguity is resolved
/// once, here, as a tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub enum OpResult {
    /// `{success, data, message}` envelope; payload lives under `data`
    Enveloped {
        success: bool,
        data: Value,
        message: Option<String>,
    },
    /// The payload itself, no envelope
    Raw(Value),
}

impl From<Value> for OpResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key("data") && map.contains_key("success") => {
                OpResult::Enveloped {
                    success: map
                        .get("success")
                        .and_then(Value::as_bool)
                        .unwrap_or(true),
                    message: map
                        .get("message")
                        .and_then(Value::as_str)
                        .map(String::from),
                    data: map.remove("data").unwrap_or(Value::Null),
                }
            }
            other => OpResult::Raw(other),
        }
    }
}

impl OpResult {
    /// Unwrap to the effective payload (`data` when enveloped, else raw)
    pub fn into_payload(self) -> Value {
        match self {
            OpResult::Enveloped { data, .. } => data,
            OpResult::Raw(value) => value,
        }
    }
}
