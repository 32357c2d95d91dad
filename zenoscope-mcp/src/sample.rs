//! Topic sampling service
//!
//! A request/response tool cannot stream, so sampling is a snapshot over a
//! bounded observation window: subscribe, wait, drain, tear down. The
//! subscription is transient and must not outlive the call - teardown runs
//! on every exit path after subscribe succeeds, including a failed poll.

use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use zenoscope_protocol::{PollResult, SubscribeAck, OP_POLL, OP_SUBSCRIBE, OP_UNSUBSCRIBE};

use crate::bridge::{ExtensionBridge, GatewayHandle};
use crate::error::McpError;

/// Wait applied when the caller gives none
pub const DEFAULT_WAIT_MS: u64 = 1000;
/// Upper bound on the observation window; keeps a caller from holding a
/// subscription open indefinitely. No lower bound.
pub const MAX_WAIT_MS: u64 = 5000;
/// Samples returned when the caller gives no limit
pub const DEFAULT_LIMIT: u64 = 10;

/// Resolve the effective wait from the requested one
pub fn clamp_wait_ms(requested: Option<u64>) -> u64 {
    requested.unwrap_or(DEFAULT_WAIT_MS).min(MAX_WAIT_MS)
}

/// Run the read-topic tool
pub async fn read_topic<H: GatewayHandle>(
    bridge: &ExtensionBridge<H>,
    arguments: &Value,
) -> Result<String, McpError> {
    // validate before any gateway call
    let key_expr = arguments
        .get("key_expr")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| McpError::InvalidParams("key_expr is required".into()))?
        .to_string();

    let wait_ms = clamp_wait_ms(arguments.get("wait_ms").and_then(Value::as_u64));
    let limit = arguments
        .get("limit")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_LIMIT);

    // buffer twice the limit so a burst between subscribe and drain is
    // absorbed rather than dropped
    let ack_payload = bridge
        .invoke(
            OP_SUBSCRIBE,
            serde_json::json!({ "key_expr": key_expr.as_str(), "buffer_size": limit * 2 }),
        )
        .await?;
    let ack: SubscribeAck = serde_json::from_value(ack_payload)?;

    tokio::time::sleep(Duration::from_millis(wait_ms)).await;

    let polled = bridge
        .invoke(
            OP_POLL,
            serde_json::json!({ "sub_id": ack.sub_id.as_str(), "limit": limit }),
        )
        .await;

    // teardown runs regardless of the poll outcome; a failed release after
    // a successful poll is logged, not surfaced
    if let Err(e) = bridge
        .invoke(
            OP_UNSUBSCRIBE,
            serde_json::json!({ "sub_id": ack.sub_id.as_str() }),
        )
        .await
    {
        warn!(sub_id = %ack.sub_id, error = %e, "Failed to release subscription");
    }

    let poll: PollResult = serde_json::from_value(polled?)?;
    Ok(render_samples(&key_expr, wait_ms, &poll))
}

fn render_samples(key_expr: &str, wait_ms: u64, poll: &PollResult) -> String {
    if poll.samples.is_empty() {
        return format!(
            "No samples received from \"{key_expr}\" within {wait_ms} ms; the topic \
             appears inactive. Try a longer wait_ms or check the key expression."
        );
    }

    let mut out = format!("{} sample(s) from \"{key_expr}\":", poll.samples.len());
    for (index, sample) in poll.samples.iter().enumerate() {
        let payload = sample
            .payload_str
            .clone()
            .unwrap_or_else(|| format!("[base64] {}", sample.payload_b64));
        out.push_str(&format!(
            "\n[{}] {} ({}): {}",
            index + 1,
            sample.key_expr,
            sample.encoding,
            payload
        ));
    }
    if poll.overflow_count > 0 {
        out.push_str(&format!(
            "\n({} samples dropped due to a full buffer)",
            poll.overflow_count
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenoscope_protocol::SampleRecord;

    fn poll_result(samples: Vec<SampleRecord>, overflow_count: u64) -> PollResult {
        PollResult {
            sub_id: "s-1".into(),
            sample_count: samples.len(),
            samples,
            overflow_count,
            buffered_remaining: 0,
        }
    }

    fn text_sample(key_expr: &str, text: &str) -> SampleRecord {
        SampleRecord {
            key_expr: key_expr.into(),
            encoding: "application/json".into(),
            payload_b64: "e30=".into(),
            payload_str: Some(text.into()),
            timestamp: None,
        }
    }

    #[test]
    fn test_clamp_default() {
        assert_eq!(clamp_wait_ms(None), 1000);
    }

    #[test]
    fn test_clamp_enforces_upper_bound() {
        assert_eq!(clamp_wait_ms(Some(100_000)), 5000);
        assert_eq!(clamp_wait_ms(Some(5001)), 5000);
        assert_eq!(clamp_wait_ms(Some(5000)), 5000);
    }

    #[test]
    fn test_clamp_has_no_lower_bound() {
        assert_eq!(clamp_wait_ms(Some(50)), 50);
        assert_eq!(clamp_wait_ms(Some(0)), 0);
    }

    #[test]
    fn test_render_no_samples_mentions_inactivity() {
        let text = render_samples("robot/pose", 1000, &poll_result(vec![], 0));
        assert!(text.contains("No samples received from \"robot/pose\" within 1000 ms"));
        assert!(text.contains("appears inactive"));
    }

    #[test]
    fn test_render_samples_one_indexed_lines() {
        let poll = poll_result(
            vec![
                text_sample("robot/pose", "{\"x\":1}"),
                text_sample("robot/pose", "{\"x\":2}"),
            ],
            0,
        );
        let text = render_samples("robot/pose", 1000, &poll);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2 sample(s) from \"robot/pose\":");
        assert_eq!(lines[1], "[1] robot/pose (application/json): {\"x\":1}");
        assert_eq!(lines[2], "[2] robot/pose (application/json): {\"x\":2}");
        assert!(!text.contains("dropped"));
    }

    #[test]
    fn test_render_binary_payload_falls_back_to_base64() {
        let sample = SampleRecord {
            key_expr: "robot/blob".into(),
            encoding: "zenoh/bytes".into(),
            payload_b64: "AQID".into(),
            payload_str: None,
            timestamp: None,
        };
        let text = render_samples("robot/blob", 500, &poll_result(vec![sample], 0));
        assert!(text.contains("[1] robot/blob (zenoh/bytes): [base64] AQID"));
    }

    #[test]
    fn test_render_overflow_note() {
        let poll = poll_result(vec![text_sample("a/b", "x")], 3);
        let text = render_samples("a/b", 1000, &poll);
        assert!(text.contains("3 samples dropped"));
    }
}
