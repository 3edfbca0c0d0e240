//! Sandbox Data Mode
//!
//! A request runs either against production data or against the isolated
//! sandbox path. The mode is resolved outside the core and only read here:
//! it decides which repository stores a record and whether responses and
//! broadcasts carry a sandbox annotation. It never influences validation or
//! broadcast keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Warning attached to every sandbox annotation.
pub const SANDBOX_WARNING: &str = "This is sandbox data and does not affect production";

/// Data path a request runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DataMode {
    /// Production data.
    #[default]
    Production,
    /// Isolated sandbox data.
    Sandbox,
}

impl DataMode {
    /// Check if this is the sandbox mode.
    #[must_use]
    pub const fn is_sandbox(&self) -> bool {
        matches!(self, Self::Sandbox)
    }

    /// Get the environment name reported to clients.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }

    /// Build the annotation for this mode, if any.
    #[must_use]
    pub fn annotation(&self, now: DateTime<Utc>) -> Option<SandboxAnnotation> {
        self.is_sandbox().then(|| SandboxAnnotation::new(now))
    }
}

/// Marker merged into sandbox payloads under the `_sandbox` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxAnnotation {
    /// Always `true`.
    pub mode: bool,
    /// Human-readable warning.
    pub warning: &'static str,
    /// When the annotated data was produced.
    pub timestamp: DateTime<Utc>,
}

impl SandboxAnnotation {
    /// Create an annotation stamped with `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            mode: true,
            warning: SANDBOX_WARNING,
            timestamp: now,
        }
    }
}
