//! Passive topic discovery
//!
//! A watcher is one background task per watched key expression: it declares
//! a Zenoh subscriber and folds every observed sample into the shared topic
//! metadata. Watchers are additive — starting discovery for a second pattern
//! never disturbs the first, and restarting an existing pattern is a no-op
//! handled by the caller. A single pruning task expires topics that have
//! gone silent.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use crate::state::GatewayState;

/// Topics silent this long are removed entirely
pub const TOPIC_EXPIRY_SECS: i64 = 30;

/// How often the pruner checks for expired topics
const PRUNE_INTERVAL_SECS: u64 = 5;

/// Spawn a watcher task subscribed to `key_expr` that updates topic
/// metadata for every sample it sees. Returns the cancel sender — send
/// `true` to stop the task.
pub fn spawn_watcher(
    session: Arc<zenoh::Session>,
    state: Arc<RwLock<GatewayState>>,
    key_expr: String,
) -> watch::Sender<bool> {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let subscriber = match session.declare_subscriber(&key_expr).await {
            Ok(s) => s,
            Err(e) => {
                warn!(key_expr = %key_expr, error = %e, "Discovery subscriber failed to declare");
                return;
            }
        };
        debug!(key_expr = %key_expr, "Discovery watcher running");

        loop {
            tokio::select! {
                sample = subscriber.recv_async() => {
                    let sample = match sample {
                        Ok(s) => s,
                        Err(_) => break,
                    };

                    let ke = sample.key_expr().as_str().to_string();
                    let encoding = sample.encoding().to_string();
                    let payload_len = sample.payload().len() as u64;

                    let mut st = state.write().await;
                    st.record_sample(ke, encoding, payload_len);
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(key_expr = %key_expr, "Discovery watcher stopped");
    });

    cancel_tx
}

/// Spawn the pruning task: every few seconds, drop topics silent for
/// [`TOPIC_EXPIRY_SECS`] or longer. Returns the cancel sender.
pub fn spawn_pruner(state: Arc<RwLock<GatewayState>>) -> watch::Sender<bool> {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(PRUNE_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let mut st = state.write().await;
                    st.prune_silent(chrono::Utc::now(), TOPIC_EXPIRY_SECS);
                }
                _ = cancel_rx.changed() => {
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });

    cancel_tx
}
