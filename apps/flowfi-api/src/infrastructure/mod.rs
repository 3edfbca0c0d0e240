//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Subscriber registry for event fan-out.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// HTTP routes, sandbox resolution, and server-sent events.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Stream intent storage.
pub mod persistence;

/// OpenTelemetry tracing integration.
pub mod telemetry;
