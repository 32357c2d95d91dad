//! MCP server error types

use std::io;

use crate::protocol::JsonRpcError;

/// MCP server errors
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// IO error (stdin/stdout)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON-RPC method not found
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// A gateway operation failed; carries the gateway's own message
    #[error("{0}")]
    Gateway(String),

    /// Gateway process could not be started
    #[error("Failed to spawn gateway: {0}")]
    ProcessSpawn(String),

    /// Gateway connection closed before the response arrived
    #[error("Gateway connection closed")]
    ConnectionClosed,

    /// Gateway did not answer within the response timeout
    #[error("Gateway response timeout after {seconds}s")]
    ResponseTimeout { seconds: u64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::MethodNotFound(method) => JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            ),
            McpError::InvalidParams(msg) => JsonRpcError::new(JsonRpcError::INVALID_PARAMS, msg),
            McpError::Json(err) => {
                JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("JSON error: {}", err))
            }
            other => JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_carries_message_verbatim() {
        let err = McpError::Gateway("subscription not found: s-1".into());
        assert_eq!(err.to_string(), "subscription not found: s-1");
    }

    #[test]
    fn test_invalid_params_display() {
        let err = McpError::InvalidParams("key_expr is required".into());
        assert!(err.to_string().contains("key_expr is required"));
    }

    #[test]
    fn test_method_not_found_maps_to_rpc_code() {
        let rpc: JsonRpcError = McpError::MethodNotFound("bogus/method".into()).into();
        assert_eq!(rpc.code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_timeout_maps_to_internal() {
        let rpc: JsonRpcError = McpError::ResponseTimeout { seconds: 30 }.into();
        assert_eq!(rpc.code, JsonRpcError::INTERNAL_ERROR);
        assert!(rpc.message.contains("30"));
    }
}
