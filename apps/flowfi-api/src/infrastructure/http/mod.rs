//! HTTP/REST API adapter.
//!
//! Inbound adapter serving the versioned stream API, server-sent event
//! subscriptions, and health endpoints.

mod controller;
mod error;
mod health;
mod response;
mod sandbox;

pub use controller::{AppState, create_router};
pub use error::ApiError;
pub use response::*;
pub use sandbox::{
    ENVIRONMENT_HEADER, RequestMode, SANDBOX_HEADER, resolve_data_mode, resolve_mode,
};
