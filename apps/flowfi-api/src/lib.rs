#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! FlowFi API - Stream Intake and Event Fan-out
//!
//! An HTTP service that validates payment-stream creation requests, records
//! them, and announces each accepted stream over server-sent events to
//! subscribers of the stream id and of both participants.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `stream`: Stream intent records and request validation
//!   - `subscription`: Broadcast keys and events
//!   - `sandbox`: Production/sandbox data mode
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Storage interface
//!   - `use_cases`: Stream intake
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `broadcast`: Subscriber registry and delivery
//!   - `http`: Axum routes, SSE, sandbox resolution
//!   - `persistence`: In-memory repositories
//!   - `config`, `metrics`, `telemetry`: Ambient services
//!
//! # Data Flow
//!
//! ```text
//! POST /v1/streams ──► validate ──► store ──► publish_to_many ──┬──► stream:<id>
//!                                                               ├──► user:<sender>
//!                                                               └──► user:<recipient>
//!                                                                        │
//!                                 GET /v1/events/... (SSE) ◄─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::sandbox::{DataMode, SandboxAnnotation};
pub use domain::stream::{
    CreateStreamInput, FieldViolation, StreamIntentRecord, StreamStatus, ValidationError,
    ViolationCode, validate_create_stream,
};
pub use domain::subscription::{BroadcastEvent, BroadcastKey, STREAM_CREATED};

// Application
pub use application::ports::{RepositoryError, StreamRepository};
pub use application::use_cases::{CreateStreamError, CreateStreamUseCase, CreatedStream};

// Infrastructure config
pub use infrastructure::config::{
    ApiConfig, BroadcastSettings, ConfigError, SandboxSettings, ServerSettings,
};

// Broadcast registry
pub use infrastructure::broadcast::{
    BroadcastConfig, BroadcastError, BroadcastRegistry, BroadcastStats, PublishReport,
    SharedBroadcastRegistry, Subscription, SubscriptionHandle,
};

// HTTP
pub use infrastructure::http::{ApiError, AppState, create_router};

// Persistence
pub use infrastructure::persistence::{InMemoryStreamRepository, StreamStores};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
