//! Configuration Module
//!
//! Configuration loading for the stream API.

mod settings;

pub use settings::{ApiConfig, BroadcastSettings, ConfigError, SandboxSettings, ServerSettings};
