//! Stream Intent Types
//!
//! Domain types for payment stream intents: the validated creation input,
//! the record synthesized from it, and its lifecycle status.
//!
//! A stream intent is only recorded and announced here. Settlement happens
//! on-chain and is not modelled by this crate.

mod validation;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use validation::{FieldViolation, ValidationError, ViolationCode, validate_create_stream};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status of a stream intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Recorded and announced, not yet observed on-chain.
    #[default]
    Pending,
}

impl StreamStatus {
    /// Get the status name as it appears on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
        }
    }
}

// =============================================================================
// Creation Input
// =============================================================================

/// A creation request that passed validation.
///
/// Fields are kept exactly as the caller sent them. `amount` stays a string
/// of ASCII digits so that on-chain `i128` amounts never pass through a
/// machine float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamInput {
    /// Sender chain address.
    pub sender: String,
    /// Recipient chain address.
    pub recipient: String,
    /// Token contract address.
    pub token_address: String,
    /// Total amount to stream, as a decimal integer string.
    pub amount: String,
    /// Stream duration in seconds.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
}

// =============================================================================
// Stream Intent Record
// =============================================================================

/// A recorded stream intent.
///
/// Built once per accepted intake request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamIntentRecord {
    /// Opaque stream identifier.
    pub id: String,
    /// Sender chain address.
    pub sender: String,
    /// Recipient chain address.
    pub recipient: String,
    /// Token contract address.
    pub token_address: String,
    /// Total amount to stream, as a decimal integer string.
    pub amount: String,
    /// Stream duration in seconds.
    #[serde(rename = "duration")]
    pub duration_seconds: u64,
    /// Lifecycle status.
    pub status: StreamStatus,
}

impl StreamIntentRecord {
    /// Create a pending record with a freshly generated id.
    #[must_use]
    pub fn pending(input: CreateStreamInput) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), input)
    }

    /// Create a pending record with a caller-supplied id.
    #[must_use]
    pub fn with_id(id: String, input: CreateStreamInput) -> Self {
        Self {
            id,
            sender: input.sender,
            recipient: input.recipient,
            token_address: input.token_address,
            amount: input.amount,
            duration_seconds: input.duration_seconds,
            status: StreamStatus::Pending,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
