//! Domain Layer - Stream intents, validation, and subscription types.
//!
//! This layer contains the core types of the service with no I/O. All types
//! here are pure Rust with serialization support.

/// Data mode (production or sandbox) and its annotation.
pub mod sandbox;

/// Stream intent records and creation-request validation.
pub mod stream;

/// Broadcast keys and events.
pub mod subscription;
