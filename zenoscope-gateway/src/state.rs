//! Gateway-side state: discovered topic metadata and live subscriptions
//!
//! Everything lives behind one `Arc<RwLock<GatewayState>>`, shared between
//! the RPC loop and the spawned watcher/receiver tasks.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use zenoscope_protocol::{SampleRecord, SubscriptionInfo, TopicStats};

/// A topic silent this long is flagged stale in `get_topics` results
pub const STALE_AFTER_SECS: i64 = 5;

/// Metadata tracked per discovered key expression (no payload buffering)
#[derive(Debug, Clone)]
pub struct TopicMeta {
    pub key_expr: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sample_count: u64,
    pub total_payload_bytes: u64,
    pub last_encoding: String,
}

impl TopicMeta {
    pub fn new(key_expr: String, encoding: String, payload_len: u64) -> Self {
        let now = Utc::now();
        Self {
            key_expr,
            first_seen: now,
            last_seen: now,
            sample_count: 1,
            total_payload_bytes: payload_len,
            last_encoding: encoding,
        }
    }

    pub fn update(&mut self, encoding: String, payload_len: u64) {
        self.last_seen = Utc::now();
        self.sample_count += 1;
        self.total_payload_bytes += payload_len;
        self.last_encoding = encoding;
    }

    /// Publish rate over the observed window; zero until the window is
    /// wide enough to be meaningful
    pub fn rate_hz(&self) -> f64 {
        let elapsed = (self.last_seen - self.first_seen).num_milliseconds() as f64 / 1000.0;
        if elapsed < 0.001 {
            0.0
        } else {
            self.sample_count as f64 / elapsed
        }
    }

    pub fn avg_payload_size(&self) -> u64 {
        if self.sample_count == 0 {
            0
        } else {
            self.total_payload_bytes / self.sample_count
        }
    }

    /// Snapshot into the wire shape, judging staleness against `now`
    pub fn to_stats(&self, now: DateTime<Utc>) -> TopicStats {
        let silent_secs = (now - self.last_seen).num_seconds();
        TopicStats {
            key_expr: self.key_expr.clone(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            sample_count: self.sample_count,
            rate_hz: (self.rate_hz() * 100.0).round() / 100.0,
            avg_payload_size: self.avg_payload_size(),
            last_encoding: self.last_encoding.clone(),
            stale: silent_secs >= STALE_AFTER_SECS,
            silent_secs,
        }
    }
}

/// An active subscription with a bounded ring buffer
pub struct Subscription {
    pub key_expr: String,
    pub buffer: VecDeque<SampleRecord>,
    pub buffer_capacity: usize,
    pub overflow_count: u64,
    pub total_received: u64,
    pub created_at: DateTime<Utc>,
    pub cancel: watch::Sender<bool>,
}

impl Subscription {
    pub fn new(key_expr: String, buffer_capacity: usize, cancel: watch::Sender<bool>) -> Self {
        Self {
            key_expr,
            buffer: VecDeque::with_capacity(buffer_capacity),
            buffer_capacity,
            overflow_count: 0,
            total_received: 0,
            created_at: Utc::now(),
            cancel,
        }
    }

    /// Push a sample, dropping the oldest buffered one when full
    pub fn push(&mut self, sample: SampleRecord) {
        self.total_received += 1;
        if self.buffer.len() >= self.buffer_capacity {
            self.buffer.pop_front();
            self.overflow_count += 1;
        }
        self.buffer.push_back(sample);
    }

    /// Drain up to `limit` samples, oldest first
    pub fn drain(&mut self, limit: usize) -> Vec<SampleRecord> {
        let n = limit.min(self.buffer.len());
        self.buffer.drain(..n).collect()
    }

    pub fn to_info(&self, sub_id: &str) -> SubscriptionInfo {
        SubscriptionInfo {
            sub_id: sub_id.to_string(),
            key_expr: self.key_expr.clone(),
            buffered: self.buffer.len(),
            buffer_capacity: self.buffer_capacity,
            overflow_count: self.overflow_count,
            total_received: self.total_received,
            created_at: self.created_at,
        }
    }
}

/// Top-level gateway state behind `Arc<RwLock>`
pub struct GatewayState {
    pub topics: HashMap<String, TopicMeta>,
    pub subscriptions: HashMap<String, Subscription>,
    /// Discovery watchers keyed by key expression; additive, one per pattern
    pub watchers: HashMap<String, watch::Sender<bool>>,
    /// Cancel handle for the topic pruning task, alive while watchers exist
    pub pruner: Option<watch::Sender<bool>>,
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            subscriptions: HashMap::new(),
            watchers: HashMap::new(),
            pruner: None,
        }
    }

    /// Record one observed sample against its topic's metadata
    pub fn record_sample(&mut self, key_expr: String, encoding: String, payload_len: u64) {
        match self.topics.get_mut(&key_expr) {
            Some(meta) => meta.update(encoding, payload_len),
            None => {
                self.topics.insert(
                    key_expr.clone(),
                    TopicMeta::new(key_expr, encoding, payload_len),
                );
            }
        }
    }

    /// Drop topics silent for `expiry_secs` or longer
    pub fn prune_silent(&mut self, now: DateTime<Utc>, expiry_secs: i64) {
        self.topics
            .retain(|_, meta| (now - meta.last_seen).num_seconds() < expiry_secs);
    }

    pub fn discovery_active(&self) -> bool {
        !self.watchers.is_empty()
    }

    /// Cancel every watcher, the pruner, and every subscription (shutdown)
    pub fn cancel_all(&mut self) {
        for (_, cancel) in self.watchers.drain() {
            let _ = cancel.send(true);
        }
        if let Some(pruner) = self.pruner.take() {
            let _ = pruner.send(true);
        }
        for (_, sub) in self.subscriptions.drain() {
            let _ = sub.cancel.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(n: u64) -> SampleRecord {
        SampleRecord {
            key_expr: "test/topic".into(),
            encoding: "text/plain".into(),
            payload_b64: "AA==".into(),
            payload_str: Some(format!("sample-{n}")),
            timestamp: Some(Utc::now()),
        }
    }

    fn subscription(capacity: usize) -> Subscription {
        let (cancel, _) = watch::channel(false);
        Subscription::new("test/topic".into(), capacity, cancel)
    }

    #[test]
    fn test_ring_buffer_overflow_drops_oldest() {
        let mut sub = subscription(3);
        for n in 0..5 {
            sub.push(sample(n));
        }

        assert_eq!(sub.buffer.len(), 3);
        assert_eq!(sub.overflow_count, 2);
        assert_eq!(sub.total_received, 5);
        // samples 0 and 1 were dropped
        assert_eq!(sub.buffer[0].payload_str.as_deref(), Some("sample-2"));
    }

    #[test]
    fn test_drain_is_oldest_first_and_bounded() {
        let mut sub = subscription(10);
        for n in 0..6 {
            sub.push(sample(n));
        }

        let drained = sub.drain(4);
        assert_eq!(drained.len(), 4);
        assert_eq!(drained[0].payload_str.as_deref(), Some("sample-0"));
        assert_eq!(drained[3].payload_str.as_deref(), Some("sample-3"));
        assert_eq!(sub.buffer.len(), 2);

        // draining more than remains takes what is there
        assert_eq!(sub.drain(10).len(), 2);
        assert!(sub.buffer.is_empty());
    }

    #[test]
    fn test_rate_hz_guards_zero_elapsed() {
        let meta = TopicMeta::new("a/b".into(), "text/plain".into(), 8);
        assert_eq!(meta.rate_hz(), 0.0);
    }

    #[test]
    fn test_rate_and_average_over_window() {
        let mut meta = TopicMeta::new("a/b".into(), "text/plain".into(), 100);
        meta.update("text/plain".into(), 300);
        meta.first_seen = meta.last_seen - Duration::seconds(2);

        assert_eq!(meta.sample_count, 2);
        assert_eq!(meta.avg_payload_size(), 200);
        assert!((meta.rate_hz() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_to_stats_staleness() {
        let meta = TopicMeta::new("a/b".into(), "text/plain".into(), 8);

        let fresh = meta.to_stats(meta.last_seen + Duration::seconds(1));
        assert!(!fresh.stale);

        let stale = meta.to_stats(meta.last_seen + Duration::seconds(STALE_AFTER_SECS));
        assert!(stale.stale);
        assert_eq!(stale.silent_secs, STALE_AFTER_SECS);
    }

    #[test]
    fn test_record_sample_inserts_then_updates() {
        let mut state = GatewayState::new();
        state.record_sample("a/b".into(), "text/plain".into(), 10);
        state.record_sample("a/b".into(), "application/json".into(), 30);

        let meta = state.topics.get("a/b").unwrap();
        assert_eq!(meta.sample_count, 2);
        assert_eq!(meta.last_encoding, "application/json");
    }

    #[test]
    fn test_prune_silent_retains_live_topics() {
        let mut state = GatewayState::new();
        state.record_sample("live".into(), "text/plain".into(), 1);
        state.record_sample("dead".into(), "text/plain".into(), 1);
        state.topics.get_mut("dead").unwrap().last_seen = Utc::now() - Duration::seconds(60);

        state.prune_silent(Utc::now(), 30);

        assert!(state.topics.contains_key("live"));
        assert!(!state.topics.contains_key("dead"));
    }

    #[test]
    fn test_cancel_all_clears_everything() {
        let mut state = GatewayState::new();
        let (watcher, _watcher_rx) = watch::channel(false);
        state.watchers.insert("**".into(), watcher);
        let (pruner, _pruner_rx) = watch::channel(false);
        state.pruner = Some(pruner);
        state
            .subscriptions
            .insert("sub-1".into(), subscription(4));

        state.cancel_all();

        assert!(state.watchers.is_empty());
        assert!(state.pruner.is_none());
        assert!(state.subscriptions.is_empty());
        assert!(!state.discovery_active());
    }
}
