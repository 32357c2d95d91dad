//! Topic discovery service
//!
//! Discovery on the bus side is push-based and never "complete" for a live
//! stream, so the tool call ensures a watcher is running, waits a fixed
//! settle interval for in-flight publishers to be observed, then reads the
//! accumulated statistics. Empty results are successes, not errors.

use serde_json::Value;
use std::time::Duration;

use zenoscope_protocol::{TopicStats, TopicsSnapshot, OP_GET_TOPICS, OP_START_DISCOVERY};

use crate::bridge::{ExtensionBridge, GatewayHandle};
use crate::error::McpError;

/// Fixed settle interval between starting discovery and querying results
pub const SETTLE_INTERVAL_MS: u64 = 500;

/// Key expression matching every topic on the bus
pub const WILDCARD_ALL: &str = "**";

/// Run the discover-topics tool
pub async fn discover_topics<H: GatewayHandle>(
    bridge: &ExtensionBridge<H>,
    arguments: &Value,
) -> Result<String, McpError> {
    let key_expr = arguments
        .get("key_expr")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(WILDCARD_ALL)
        .to_string();

    // fire-and-forget: starting an already-watched pattern is a no-op on
    // the gateway side, so repeated discover calls never stack watchers
    bridge
        .invoke(
            OP_START_DISCOVERY,
            serde_json::json!({ "key_expr": key_expr.as_str() }),
        )
        .await?;

    tokio::time::sleep(Duration::from_millis(SETTLE_INTERVAL_MS)).await;

    let prefix = if key_expr == WILDCARD_ALL {
        ""
    } else {
        key_expr.as_str()
    };
    let payload = bridge
        .invoke(OP_GET_TOPICS, serde_json::json!({ "prefix": prefix }))
        .await?;
    let snapshot: TopicsSnapshot = serde_json::from_value(payload)?;

    Ok(render_topics(&key_expr, &snapshot.topics))
}

fn render_topics(key_expr: &str, topics: &[TopicStats]) -> String {
    if topics.is_empty() {
        return format!(
            "No Zenoh topics found matching \"{key_expr}\". \
             Discovery is still warming up; retry in a few seconds."
        );
    }

    let mut out = format!(
        "Found {} Zenoh topic(s) matching \"{key_expr}\":",
        topics.len()
    );
    for topic in topics {
        out.push_str(&format!(
            "\n{} ({} Hz, {}, avg {}B, {} samples)",
            topic.key_expr,
            topic.rate_hz,
            topic.last_encoding,
            topic.avg_payload_size,
            topic.sample_count
        ));
    }
    out
}
