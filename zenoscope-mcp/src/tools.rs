//! MCP tool definitions for zenoscope
//!
//! Defines the two tools exposed through the MCP protocol.

use crate::protocol::Tool;

/// Tool name: discover active topics under a key expression
pub const TOOL_DISCOVER_TOPICS: &str = "discover_zenoh_topics";
/// Tool name: sample messages from one topic
pub const TOOL_READ_TOPIC: &str = "read_zenoh_topic";

/// Get all tool definitions for the zenoscope MCP server
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: TOOL_DISCOVER_TOPICS.into(),
            description: "Discover active Zenoh topics matching a key expression. Starts passive \
                discovery if needed, waits briefly, then reports per-topic statistics \
                (rate, encoding, payload size, sample count). An empty result is normal right \
                after discovery starts - retry a few seconds later."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "key_expr": {
                        "type": "string",
                        "description": "Key expression to discover under, wildcards allowed (default: \"**\", everything)"
                    }
                }
            }),
        },
        Tool {
            name: TOOL_READ_TOPIC.into(),
            description: "Read a bounded batch of samples from a Zenoh topic. Opens a \
                subscription, waits up to wait_ms for samples to accumulate, returns at most \
                'limit' of them, then tears the subscription down."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "key_expr": {
                        "type": "string",
                        "description": "Key expression of the topic to sample"
                    },
                    "wait_ms": {
                        "type": "integer",
                        "description": "How long to let samples accumulate, in milliseconds (default: 1000, max: 5000)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of samples to return (default: 10)"
                    }
                },
                "required": ["key_expr"]
            }),
        },
    ]
}
