//! Broadcast Registry
//!
//! In-process fan-out of named events to subscribers keyed by stream id or
//! user address.
//!
//! # Architecture
//!
//! Each subscriber owns a bounded tokio mpsc channel. The registry keeps the
//! sending halves grouped by `BroadcastKey`, in registration order:
//!
//! - `publish` snapshots a key's senders under a read lock and delivers with
//!   `try_send` outside the lock, so a slow subscriber never blocks the
//!   publisher or its siblings.
//! - A full channel loses that one event; a closed channel is pruned.
//! - Nothing is persisted or replayed. A subscriber that registers after a
//!   publish never sees that event.
//!
//! One registry is built per process and shared through `Arc`.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::BroadcastSettings;
use crate::domain::subscription::{BroadcastEvent, BroadcastKey, SubscriptionId};
use crate::infrastructure::metrics;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for subscriber channels.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastConfig {
    /// Capacity of each subscriber's channel.
    pub subscriber_buffer: usize,
    /// Maximum number of subscribers registered under one key.
    pub max_subscribers_per_key: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
            max_subscribers_per_key: 256,
        }
    }
}

impl From<BroadcastSettings> for BroadcastConfig {
    fn from(settings: BroadcastSettings) -> Self {
        Self {
            subscriber_buffer: settings.subscriber_buffer,
            max_subscribers_per_key: settings.max_subscribers_per_key,
        }
    }
}

// =============================================================================
// Handles and Reports
// =============================================================================

/// Handle identifying one registered subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    key: BroadcastKey,
}

impl SubscriptionHandle {
    /// Get the subscription id.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Get the key the subscription is registered under.
    #[must_use]
    pub const fn key(&self) -> &BroadcastKey {
        &self.key
    }
}

/// Outcome of a publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the event was queued for.
    pub delivered: usize,
    /// Subscribers whose channel was full; they missed this event.
    pub dropped: usize,
    /// Subscribers found closed and removed.
    pub pruned: usize,
}

impl AddAssign for PublishReport {
    fn add_assign(&mut self, rhs: Self) {
        self.delivered += rhs.delivered;
        self.dropped += rhs.dropped;
        self.pruned += rhs.pruned;
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Keys with at least one subscriber.
    pub keys: usize,
    /// Subscribers across all keys.
    pub subscribers: usize,
}

/// Broadcast registry errors.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The key already has the maximum number of subscribers.
    #[error("subscriber limit of {limit} reached for {key}")]
    SubscriberLimit {
        /// Key that is full.
        key: BroadcastKey,
        /// Configured limit.
        limit: usize,
    },

    /// The channel was already closed when subscribing.
    #[error("cannot subscribe a closed channel to {0}")]
    ChannelClosed(BroadcastKey),
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Debug)]
struct Subscriber {
    id: SubscriptionId,
    tx: mpsc::Sender<BroadcastEvent>,
}

/// Many-to-many pub/sub registry keyed by `BroadcastKey`.
///
/// # Example
///
/// ```rust
/// use flowfi_api::domain::subscription::BroadcastKey;
/// use flowfi_api::infrastructure::broadcast::BroadcastRegistry;
/// use tokio::sync::mpsc;
///
/// let registry = BroadcastRegistry::with_defaults();
/// let (tx, mut rx) = mpsc::channel(8);
/// let handle = registry.subscribe(BroadcastKey::user("GABC"), tx).unwrap();
///
/// let report = registry.publish(
///     &BroadcastKey::user("GABC"),
///     "stream.created",
///     serde_json::json!({ "id": "1" }),
/// );
/// assert_eq!(report.delivered, 1);
/// assert_eq!(&*rx.try_recv().unwrap().name, "stream.created");
///
/// registry.unsubscribe(&handle);
/// assert_eq!(registry.total_subscribers(), 0);
/// ```
#[derive(Debug)]
pub struct BroadcastRegistry {
    config: BroadcastConfig,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<BroadcastKey, Vec<Subscriber>>>,
}

/// Shared broadcast registry reference.
pub type SharedBroadcastRegistry = Arc<BroadcastRegistry>;

impl BroadcastRegistry {
    /// Create a new registry with the given configuration.
    #[must_use]
    pub fn new(config: BroadcastConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new registry with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(BroadcastConfig::default())
    }

    /// Get the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a channel under `key`.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::SubscriberLimit` if the key is full, or
    /// `BroadcastError::ChannelClosed` if the receiver is already gone.
    pub fn subscribe(
        &self,
        key: BroadcastKey,
        channel: mpsc::Sender<BroadcastEvent>,
    ) -> Result<SubscriptionHandle, BroadcastError> {
        if channel.is_closed() {
            return Err(BroadcastError::ChannelClosed(key));
        }

        let limit = self.config.max_subscribers_per_key;
        let mut map = self.subscribers.write();

        if map.get(&key).is_some_and(|list| list.len() >= limit) {
            drop(map);
            metrics::record_subscription_rejected();
            tracing::warn!(key = %key, limit, "Subscriber limit reached");
            return Err(BroadcastError::SubscriberLimit { key, limit });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        map.entry(key.clone())
            .or_default()
            .push(Subscriber { id, tx: channel });
        let total = total_in(&map);
        drop(map);

        metrics::set_subscribers(total);
        tracing::debug!(key = %key, subscription_id = id, "Subscriber registered");

        Ok(SubscriptionHandle { id, key })
    }

    /// Create a bounded channel, register it under `key`, and return the
    /// receiving side as a `Subscription`.
    ///
    /// The subscription unregisters itself when dropped.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::SubscriberLimit` if the key is full.
    pub fn open(self: &Arc<Self>, key: BroadcastKey) -> Result<Subscription, BroadcastError> {
        let (tx, receiver) = mpsc::channel(self.config.subscriber_buffer);
        let handle = self.subscribe(key, tx)?;

        Ok(Subscription {
            handle,
            receiver,
            registry: Arc::clone(self),
        })
    }

    /// Remove a subscription.
    ///
    /// Idempotent. Returns `true` only if this call removed it.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let removed = {
            let mut map = self.subscribers.write();
            remove_ids(&mut map, &handle.key, &[handle.id])
        };

        if removed > 0 {
            metrics::set_subscribers(self.total_subscribers());
            tracing::debug!(
                key = %handle.key,
                subscription_id = handle.id,
                "Subscriber removed"
            );
        }

        removed > 0
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Deliver an event to every subscriber of `key`, in registration order.
    ///
    /// Never fails: full subscribers miss the event, closed subscribers are
    /// pruned. Publishing to a key without subscribers is a no-op.
    pub fn publish(&self, key: &BroadcastKey, event_name: &str, payload: Value) -> PublishReport {
        self.deliver(key, &BroadcastEvent::new(event_name, payload))
    }

    /// Deliver one event to the subscribers of each key in turn.
    ///
    /// Equivalent to calling `publish` once per key with the same payload.
    /// Keys are notified independently; there is no atomicity across them.
    pub fn publish_to_many(
        &self,
        keys: &[BroadcastKey],
        event_name: &str,
        payload: Value,
    ) -> PublishReport {
        let event = BroadcastEvent::new(event_name, payload);
        let mut report = PublishReport::default();
        for key in keys {
            report += self.deliver(key, &event);
        }
        report
    }

    fn deliver(&self, key: &BroadcastKey, event: &BroadcastEvent) -> PublishReport {
        let snapshot: Vec<(SubscriptionId, mpsc::Sender<BroadcastEvent>)> = {
            let map = self.subscribers.read();
            let Some(list) = map.get(key) else {
                return PublishReport::default();
            };
            list.iter().map(|s| (s.id, s.tx.clone())).collect()
        };

        let mut report = PublishReport::default();
        let mut closed = Vec::new();

        for (id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::warn!(
                        key = %key,
                        subscription_id = id,
                        event = %event.name,
                        "Subscriber lagging, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let removed = {
                let mut map = self.subscribers.write();
                remove_ids(&mut map, key, &closed)
            };
            report.pruned = removed;
            metrics::record_subscribers_pruned(removed as u64);
            metrics::set_subscribers(self.total_subscribers());
            tracing::debug!(key = %key, pruned = removed, "Pruned closed subscribers");
        }

        metrics::record_events_delivered(&event.name, report.delivered as u64);
        metrics::record_events_dropped(&event.name, report.dropped as u64);

        report
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get the number of subscribers registered under `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &BroadcastKey) -> usize {
        self.subscribers.read().get(key).map_or(0, Vec::len)
    }

    /// Get the number of subscribers across all keys.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        total_in(&self.subscribers.read())
    }

    /// Get the number of keys with at least one subscriber.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Get statistics about the registry.
    #[must_use]
    pub fn stats(&self) -> BroadcastStats {
        let map = self.subscribers.read();
        BroadcastStats {
            keys: map.len(),
            subscribers: total_in(&map),
        }
    }
}

fn total_in(map: &HashMap<BroadcastKey, Vec<Subscriber>>) -> usize {
    map.values().map(Vec::len).sum()
}

/// Remove the given ids under `key`, dropping the key once empty.
fn remove_ids(
    map: &mut HashMap<BroadcastKey, Vec<Subscriber>>,
    key: &BroadcastKey,
    ids: &[SubscriptionId],
) -> usize {
    let Some(list) = map.get_mut(key) else {
        return 0;
    };

    let before = list.len();
    list.retain(|s| !ids.contains(&s.id));
    let removed = before - list.len();

    if list.is_empty() {
        map.remove(key);
    }

    removed
}

// =============================================================================
// Subscription
// =============================================================================

/// Receiving side of a registered subscription.
///
/// Yields events as a `Stream`. Dropping it unregisters the subscription, so
/// a disconnected SSE client is removed as soon as its response body is
/// dropped.
#[derive(Debug)]
pub struct Subscription {
    handle: SubscriptionHandle,
    receiver: mpsc::Receiver<BroadcastEvent>,
    registry: SharedBroadcastRegistry,
}

impl Subscription {
    /// Get the subscription handle.
    #[must_use]
    pub const fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = BroadcastEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(&self.handle);
    }
}

// =============================================================================
// Tests
// =============================================================================
