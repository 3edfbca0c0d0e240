//! HTTP response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::stream::FieldViolation;

/// API versions served under a path prefix.
pub const SUPPORTED_VERSIONS: [&str; 1] = ["v1"];

/// Version used when a route carries no prefix.
pub const DEFAULT_VERSION: &str = "v1";

/// Date after which deprecated aliases may be removed.
pub const SUNSET_DATE: &str = "2024-12-31";

/// Plain message body used by most errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of a rejected stream creation request.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFailedResponse {
    /// Always "Validation failed".
    pub message: &'static str,
    /// One entry per offending field.
    pub errors: Vec<FieldViolation>,
}

/// Old and new location of a moved endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Deprecated path.
    pub old: String,
    /// Replacement path.
    pub new: String,
}

/// Body returned by deprecated unversioned aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprecatedResponse {
    /// Short error name.
    pub error: String,
    /// Migration hint.
    pub message: String,
    /// Always true.
    pub deprecated: bool,
    /// Where to go instead.
    pub migration: Migration,
    /// Removal date.
    pub sunset_date: String,
}

impl DeprecatedResponse {
    /// Build the body for an unversioned alias such as `/streams`.
    #[must_use]
    pub fn for_resource(name: &str) -> Self {
        Self {
            error: "Deprecated endpoint".to_string(),
            message: format!(
                "This endpoint has been deprecated. Please use /{DEFAULT_VERSION}/{name} instead."
            ),
            deprecated: true,
            migration: Migration {
                old: format!("/{name}"),
                new: format!("/{DEFAULT_VERSION}/{name}"),
            },
            sunset_date: SUNSET_DATE.to_string(),
        }
    }
}

/// Body returned for an unknown API version prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsupportedVersionResponse {
    /// Short error name.
    pub error: String,
    /// Which version was asked for and which exist.
    pub message: String,
    /// Supported version prefixes.
    pub supported_versions: Vec<String>,
}

impl UnsupportedVersionResponse {
    /// Build the body for a requested version.
    #[must_use]
    pub fn for_version(version: &str) -> Self {
        Self {
            error: "Unsupported API version".to_string(),
            message: format!(
                "API version '{version}' is not supported. Supported versions: {}",
                SUPPORTED_VERSIONS.join(", ")
            ),
            supported_versions: SUPPORTED_VERSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// API version summary reported by `/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVersions {
    /// Supported version prefixes.
    pub supported: Vec<String>,
    /// Version used by unprefixed routes.
    pub default: String,
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            supported: SUPPORTED_VERSIONS.iter().map(ToString::to_string).collect(),
            default: DEFAULT_VERSION.to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,
    /// Current time.
    pub timestamp: DateTime<Utc>,
    /// Uptime in seconds.
    pub uptime: f64,
    /// Service version.
    pub version: String,
    /// Served API versions.
    pub api_versions: ApiVersions,
    /// Live event subscribers.
    pub subscribers: usize,
}
