//! Typed operation payloads
//!
//! These mirror the JSON shapes the gateway produces under the operation
//! result envelope. Consumers deserialize the effective payload into these
//! rather than poking at raw `Value`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observed statistics for one discovered topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStats {
    /// Key expression the topic publishes under
    pub key_expr: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Cumulative samples observed since first seen
    pub sample_count: u64,
    /// Publish rate over the observation window, rounded to 2 decimals
    pub rate_hz: f64,
    /// Average payload size in bytes
    pub avg_payload_size: u64,
    pub last_encoding: String,
    /// Silent for 5 seconds or more
    pub stale: bool,
    pub silent_secs: i64,
}

/// Result payload of `get_topics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsSnapshot {
    pub discovery_active: bool,
    pub topic_count: usize,
    pub topics: Vec<TopicStats>,
}

/// One observed message on a topic.
///
/// `payload_b64` is always present; `payload_str` only when the payload
/// decoded as UTF-8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub key_expr: String,
    pub encoding: String,
    pub payload_b64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Result payload of `subscribe`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeAck {
    pub sub_id: String,
    pub key_expr: String,
    pub buffer_size: usize,
}

/// Result payload of `poll`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResult {
    pub sub_id: String,
    pub samples: Vec<SampleRecord>,
    #[serde(default)]
    pub sample_count: usize,
    /// Samples dropped because the bounded buffer filled before the drain
    #[serde(default)]
    pub overflow_count: u64,
    #[serde(default)]
    pub buffered_remaining: usize,
}

/// One entry in the `list_subscriptions` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub sub_id: String,
    pub key_expr: String,
    pub buffered: usize,
    pub buffer_capacity: usize,
    pub overflow_count: u64,
    pub total_received: u64,
    pub created_at: DateTime<Utc>,
}

/// Result payload of `session_info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// The gateway's own Zenoh id
    pub zid: String,
    pub peers: Vec<String>,
    pub routers: Vec<String>,
    pub config_source: String,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_snapshot_deserializes_from_gateway_shape() {
        let payload = serde_json::json!({
            "discovery_active": true,
            "topic_count": 1,
            "topics": [{
                "key_expr": "robot/pose",
                "first_seen": "2026-08-01T10:00:00Z",
                "last_seen": "2026-08-01T10:00:40Z",
                "sample_count": 420,
                "rate_hz": 10.5,
                "avg_payload_size": 128,
                "last_encoding": "application/json",
                "stale": false,
                "silent_secs": 0,
            }],
        });

        let snapshot: TopicsSnapshot = serde_json::from_value(payload).unwrap();
        assert_eq!(snapshot.topic_count, 1);
        assert_eq!(snapshot.topics[0].key_expr, "robot/pose");
        assert_eq!(snapshot.topics[0].rate_hz, 10.5);
    }

    #[test]
    fn test_sample_record_optional_fields_default() {
        let payload = serde_json::json!({
            "key_expr": "robot/cmd",
            "encoding": "application/octet-stream",
            "payload_b64": "AQID",
        });

        let sample: SampleRecord = serde_json::from_value(payload).unwrap();
        assert!(sample.payload_str.is_none());
        assert!(sample.timestamp.is_none());
    }

    #[test]
    fn test_sample_record_skips_absent_text_payload() {
        let sample = SampleRecord {
            key_expr: "a/b".into(),
            encoding: "zenoh/bytes".into(),
            payload_b64: "AQID".into(),
            payload_str: None,
            timestamp: None,
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("payload_str"));
        assert!(!json.contains("timestamp"));
    }

    #[test]
    fn test_poll_result_counters_default_to_zero() {
        let payload = serde_json::json!({
            "sub_id": "s-1",
            "samples": [],
        });
        let poll: PollResult = serde_json::from_value(payload).unwrap();
        assert_eq!(poll.overflow_count, 0);
        assert_eq!(poll.buffered_remaining, 0);
    }
}
