//! Tool dispatcher
//!
//! Maps a tool name onto the discovery or sampling service and normalizes
//! every outcome - including unknown tools and faults raised anywhere down
//! the call chain - into one result envelope. From the transport's point of
//! view a well-formed tool call always succeeds; failure lives in the
//! envelope's own flag.

use serde_json::Value;
use tracing::{info, warn};

use crate::bridge::{ExtensionBridge, GatewayHandle};
use crate::discover;
use crate::protocol::ToolResult;
use crate::sample;
use crate::tools::{TOOL_DISCOVER_TOPICS, TOOL_READ_TOPIC};

/// One incoming tool invocation
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool_name: String,
    pub arguments: Value,
}

/// Dispatch a tool call, absorbing every failure into the envelope
pub async fn dispatch<H: GatewayHandle>(
    bridge: &ExtensionBridge<H>,
    request: ToolRequest,
) -> ToolResult {
    info!(tool = %request.tool_name, "Dispatching tool call");

    let outcome = match request.tool_name.as_str() {
        TOOL_DISCOVER_TOPICS => discover::discover_topics(bridge, &request.arguments).await,
        TOOL_READ_TOPIC => sample::read_topic(bridge, &request.arguments).await,
        other => {
            // no gateway traffic for a name we do not recognize
            return ToolResult::error(format!("Unknown tool: {other}"));
        }
    };

    match outcome {
        Ok(text) => ToolResult::text(text),
        Err(e) => {
            warn!(tool = %request.tool_name, error = %e, "Tool call failed");
            ToolResult::error(e.to_string())
        }
    }
}
