//! Operation handlers behind the gateway's `execute` method
//!
//! Each handler parses its typed input, touches shared state, and returns a
//! JSON payload that the RPC loop wraps in the operation envelope.

use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::warn;

use zenoscope_protocol::{
    PollResult, SampleRecord, SubscribeAck, TopicsSnapshot, OP_GET_TOPICS, OP_LIST_SUBSCRIPTIONS,
    OP_POLL, OP_SESSION_INFO, OP_START_DISCOVERY, OP_STOP_DISCOVERY, OP_SUBSCRIBE, OP_UNSUBSCRIBE,
};

use crate::discovery::{spawn_pruner, spawn_watcher};
use crate::state::{GatewayState, Subscription};

/// Failure of a single operation; surfaced as JSON-RPC error -32000
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type OpOutcome = std::result::Result<Value, OpError>;

fn parse_input<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, OpError> {
    serde_json::from_value(input.clone()).map_err(|e| OpError::Input(e.to_string()))
}

fn to_payload<T: serde::Serialize>(value: &T) -> OpOutcome {
    serde_json::to_value(value).map_err(|e| OpError::Internal(e.to_string()))
}

/// Dispatch a named operation
pub async fn dispatch(
    operation: &str,
    input: &Value,
    session: &Arc<zenoh::Session>,
    state: &Arc<RwLock<GatewayState>>,
) -> OpOutcome {
    match operation {
        OP_SESSION_INFO => op_session_info(session).await,
        OP_START_DISCOVERY => op_start_discovery(input, session, state).await,
        OP_STOP_DISCOVERY => op_stop_discovery(input, state).await,
        OP_GET_TOPICS => op_get_topics(input, state).await,
        OP_SUBSCRIBE => op_subscribe(input, session, state).await,
        OP_UNSUBSCRIBE => op_unsubscribe(input, state).await,
        OP_POLL => op_poll(input, state).await,
        OP_LIST_SUBSCRIPTIONS => op_list_subscriptions(state).await,
        other => Err(OpError::UnknownOperation(other.to_string())),
    }
}

pub async fn op_session_info(session: &Arc<zenoh::Session>) -> OpOutcome {
    let zid = session.zid().to_string();
    let peers: Vec<String> = session
        .info()
        .peers_zid()
        .await
        .map(|z| z.to_string())
        .collect();
    let routers: Vec<String> = session
        .info()
        .routers_zid()
        .await
        .map(|z| z.to_string())
        .collect();
    let config_source = std::env::var("ZENOH_CONFIG").unwrap_or_else(|_| "default".into());

    Ok(serde_json::json!({
        "zid": zid,
        "peers": peers,
        "routers": routers,
        "config_source": config_source,
        "connected": true,
    }))
}

fn default_key_expr() -> String {
    "**".into()
}

#[derive(Deserialize)]
struct StartDiscoveryInput {
    #[serde(default = "default_key_expr")]
    key_expr: String,
}

/// Start watching a key expression. Additive and idempotent: a pattern
/// already being watched is left untouched, and other watchers keep
/// running.
pub async fn op_start_discovery(
    input: &Value,
    session: &Arc<zenoh::Session>,
    state: &Arc<RwLock<GatewayState>>,
) -> OpOutcome {
    let StartDiscoveryInput { key_expr } = parse_input(input)?;

    let mut st = state.write().await;
    if !st.watchers.contains_key(&key_expr) {
        if st.pruner.is_none() {
            st.pruner = Some(spawn_pruner(state.clone()));
        }
        let cancel = spawn_watcher(session.clone(), state.clone(), key_expr.clone());
        st.watchers.insert(key_expr.clone(), cancel);
    }

    Ok(serde_json::json!({
        "started": true,
        "key_expr": key_expr,
    }))
}

#[derive(Deserialize)]
struct StopDiscoveryInput {
    #[serde(default)]
    key_expr: Option<String>,
}

/// Stop one watcher, or all of them when no key expression is given.
/// Accumulated topic statistics are kept; the pruner ages them out.
pub async fn op_stop_discovery(input: &Value, state: &Arc<RwLock<GatewayState>>) -> OpOutcome {
    let StopDiscoveryInput { key_expr } = parse_input(input)?;

    let mut st = state.write().await;
    match key_expr {
        Some(key_expr) => {
            if let Some(cancel) = st.watchers.remove(&key_expr) {
                let _ = cancel.send(true);
            }
        }
        None => {
            for (_, cancel) in st.watchers.drain() {
                let _ = cancel.send(true);
            }
        }
    }
    if st.watchers.is_empty() {
        if let Some(pruner) = st.pruner.take() {
            let _ = pruner.send(true);
        }
    }

    Ok(serde_json::json!({ "stopped": true }))
}

#[derive(Deserialize)]
struct GetTopicsInput {
    #[serde(default)]
    prefix: String,
}

pub async fn op_get_topics(input: &Value, state: &Arc<RwLock<GatewayState>>) -> OpOutcome {
    let GetTopicsInput { prefix } = parse_input(input)?;

    let now = chrono::Utc::now();
    let st = state.read().await;
    let mut topics: Vec<_> = st
        .topics
        .values()
        .filter(|t| prefix.is_empty() || t.key_expr.starts_with(&prefix))
        .map(|t| t.to_stats(now))
        .collect();
    topics.sort_by(|a, b| a.key_expr.cmp(&b.key_expr));

    to_payload(&TopicsSnapshot {
        discovery_active: st.discovery_active(),
        topic_count: topics.len(),
        topics,
    })
}

fn default_buffer_size() -> usize {
    100
}

#[derive(Deserialize)]
struct SubscribeInput {
    key_expr: String,
    #[serde(default = "default_buffer_size")]
    buffer_size: usize,
}

pub async fn op_subscribe(
    input: &Value,
    session: &Arc<zenoh::Session>,
    state: &Arc<RwLock<GatewayState>>,
) -> OpOutcome {
    let SubscribeInput {
        key_expr,
        buffer_size,
    } = parse_input(input)?;

    let sub_id = uuid::Uuid::new_v4().to_string();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let sub = Subscription::new(key_expr.clone(), buffer_size, cancel_tx);

    {
        let mut st = state.write().await;
        st.subscriptions.insert(sub_id.clone(), sub);
    }

    spawn_receiver(
        session.clone(),
        state.clone(),
        sub_id.clone(),
        key_expr.clone(),
        cancel_rx,
    );

    to_payload(&SubscribeAck {
        sub_id,
        key_expr,
        buffer_size,
    })
}

/// Background task feeding one subscription's ring buffer
fn spawn_receiver(
    session: Arc<zenoh::Session>,
    state: Arc<RwLock<GatewayState>>,
    sub_id: String,
    key_expr: String,
    mut cancel_rx: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let subscriber = match session.declare_subscriber(&key_expr).await {
            Ok(s) => s,
            Err(e) => {
                warn!(key_expr = %key_expr, error = %e, "Subscribe failed to declare");
                return;
            }
        };

        loop {
            tokio::select! {
                sample = subscriber.recv_async() => {
                    let sample = match sample {
                        Ok(s) => s,
                        Err(_) => break,
                    };

                    let ke = sample.key_expr().as_str().to_string();
                    let payload_bytes: Vec<u8> = sample.payload().to_bytes().to_vec();
                    let encoding = sample.encoding().to_string();
                    let payload_b64 =
                        base64::engine::general_purpose::STANDARD.encode(&payload_bytes);
                    let payload_str = String::from_utf8(payload_bytes).ok();

                    let record = SampleRecord {
                        key_expr: ke,
                        encoding,
                        payload_b64,
                        payload_str,
                        timestamp: Some(chrono::Utc::now()),
                    };

                    let mut st = state.write().await;
                    match st.subscriptions.get_mut(&sub_id) {
                        Some(sub) => sub.push(record),
                        // subscription was removed; stop the task
                        None => break,
                    }
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
}

#[derive(Deserialize)]
struct PollInput {
    sub_id: String,
    #[serde(default = "default_poll_limit")]
    limit: usize,
}

fn default_poll_limit() -> usize {
    10
}

pub async fn op_poll(input: &Value, state: &Arc<RwLock<GatewayState>>) -> OpOutcome {
    let PollInput { sub_id, limit } = parse_input(input)?;

    let mut st = state.write().await;
    let sub = st
        .subscriptions
        .get_mut(&sub_id)
        .ok_or_else(|| OpError::SubscriptionNotFound(sub_id.clone()))?;

    let samples = sub.drain(limit);
    let result = PollResult {
        sub_id,
        sample_count: samples.len(),
        overflow_count: sub.overflow_count,
        buffered_remaining: sub.buffer.len(),
        samples,
    };
    to_payload(&result)
}

#[derive(Deserialize)]
struct UnsubscribeInput {
    sub_id: String,
}

pub async fn op_unsubscribe(input: &Value, state: &Arc<RwLock<GatewayState>>) -> OpOutcome {
    let UnsubscribeInput { sub_id } = parse_input(input)?;

    let mut st = state.write().await;
    match st.subscriptions.remove(&sub_id) {
        Some(sub) => {
            let _ = sub.cancel.send(true);
            Ok(serde_json::json!({
                "removed": true,
                "sub_id": sub_id,
            }))
        }
        None => Err(OpError::SubscriptionNotFound(sub_id)),
    }
}

pub async fn op_list_subscriptions(state: &Arc<RwLock<GatewayState>>) -> OpOutcome {
    let st = state.read().await;
    let mut subs: Vec<_> = st
        .subscriptions
        .iter()
        .map(|(id, sub)| sub.to_info(id))
        .collect();
    subs.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    Ok(serde_json::json!({
        "count": subs.len(),
        "subscriptions": subs,
    }))
}
