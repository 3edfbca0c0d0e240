//! API Configuration Settings
//!
//! Configuration types for the stream API, loaded from environment variables.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind address.
    pub host: IpAddr,
    /// HTTP port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3001,
        }
    }
}

impl ServerSettings {
    /// Get the socket address to bind.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Sandbox mode settings.
///
/// Sandbox requests are only honoured when `enabled` is set. Either the
/// header or the query parameter may be disabled independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSettings {
    /// Whether sandbox mode is available at all.
    pub enabled: bool,
    /// Whether the header may activate sandbox mode.
    pub allow_header: bool,
    /// Whether the query parameter may activate sandbox mode.
    pub allow_query_param: bool,
    /// Header name checked for the sandbox flag.
    pub header_name: String,
    /// Query parameter name checked for the sandbox flag.
    pub query_param_name: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_header: true,
            allow_query_param: true,
            header_name: "X-Sandbox-Mode".to_string(),
            query_param_name: "sandbox".to_string(),
        }
    }
}

/// Event broadcast settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Capacity of each subscriber's event channel.
    pub subscriber_buffer: usize,
    /// Maximum subscribers per stream id or user address.
    pub max_subscribers_per_key: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive_interval: Duration,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
            max_subscribers_per_key: 256,
            keep_alive_interval: Duration::from_secs(15),
        }
    }
}

/// Complete API configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Sandbox mode settings.
    pub sandbox: SandboxSettings,
    /// Event broadcast settings.
    pub broadcast: BroadcastSettings,
}

impl ApiConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but unusable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_defaults = ServerSettings::default();
        let host = match lookup("FLOWFI_HOST") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "FLOWFI_HOST".to_string(),
                reason: format!("'{raw}' is not an IP address"),
            })?,
            None => server_defaults.host,
        };
        let server = ServerSettings {
            host,
            port: parse_or(&lookup, "PORT", server_defaults.port),
        };

        let sandbox_defaults = SandboxSettings::default();
        let sandbox = SandboxSettings {
            // Opt-in: anything but "true" keeps sandbox off.
            enabled: lookup("SANDBOX_MODE_ENABLED").is_some_and(|v| v == "true"),
            // Opt-out: anything but "false" keeps the toggle allowed.
            allow_header: lookup("SANDBOX_ALLOW_HEADER").is_none_or(|v| v != "false"),
            allow_query_param: lookup("SANDBOX_ALLOW_QUERY_PARAM").is_none_or(|v| v != "false"),
            header_name: non_empty(&lookup, "SANDBOX_HEADER_NAME")
                .unwrap_or(sandbox_defaults.header_name),
            query_param_name: non_empty(&lookup, "SANDBOX_QUERY_PARAM_NAME")
                .unwrap_or(sandbox_defaults.query_param_name),
        };

        let broadcast_defaults = BroadcastSettings::default();
        let broadcast = BroadcastSettings {
            subscriber_buffer: parse_or(
                &lookup,
                "FLOWFI_SUBSCRIBER_BUFFER",
                broadcast_defaults.subscriber_buffer,
            ),
            max_subscribers_per_key: parse_or(
                &lookup,
                "FLOWFI_MAX_SUBSCRIBERS_PER_KEY",
                broadcast_defaults.max_subscribers_per_key,
            ),
            keep_alive_interval: lookup("FLOWFI_SSE_KEEP_ALIVE_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(broadcast_defaults.keep_alive_interval, Duration::from_secs),
        };

        if broadcast.subscriber_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLOWFI_SUBSCRIBER_BUFFER".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if broadcast.max_subscribers_per_key == 0 {
            return Err(ConfigError::InvalidValue {
                key: "FLOWFI_MAX_SUBSCRIBERS_PER_KEY".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            server,
            sandbox,
            broadcast,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}
