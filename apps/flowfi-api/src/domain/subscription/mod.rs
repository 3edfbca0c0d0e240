//! Subscription Types
//!
//! Domain types for event subscriptions: the keys subscribers listen on and
//! the events delivered to them.
//!
//! # Design
//!
//! Subscribers listen either on a stream id or on a user (chain address).
//! The two live in separate namespaces, so a user whose address happens to
//! equal some stream id never receives that stream's events by accident.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a registered subscription.
pub type SubscriptionId = u64;

/// Key a subscription is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BroadcastKey {
    /// Events about a single stream.
    Stream(String),
    /// Events involving a user as sender or recipient.
    User(String),
}

impl BroadcastKey {
    /// Key for a stream id.
    #[must_use]
    pub fn stream(id: impl Into<String>) -> Self {
        Self::Stream(id.into())
    }

    /// Key for a user address.
    #[must_use]
    pub fn user(address: impl Into<String>) -> Self {
        Self::User(address.into())
    }

    /// Get the namespace name ("stream" or "user").
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stream(_) => "stream",
            Self::User(_) => "user",
        }
    }

    /// Get the raw identifier without namespace.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Stream(id) | Self::User(id) => id,
        }
    }
}

impl fmt::Display for BroadcastKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

// =============================================================================
// Events
// =============================================================================

/// Event name announcing a newly recorded stream.
pub const STREAM_CREATED: &str = "stream.created";

/// A named event delivered to subscribers.
///
/// The payload is shared between all subscribers of one publish call.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    /// Event name (e.g. `stream.created`).
    pub name: Arc<str>,
    /// JSON payload.
    pub payload: Arc<Value>,
}

impl BroadcastEvent {
    /// Create a new event.
    #[must_use]
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            name: Arc::from(name),
            payload: Arc::new(payload),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
