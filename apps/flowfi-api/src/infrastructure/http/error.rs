//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::response::{
    DeprecatedResponse, MessageResponse, UnsupportedVersionResponse, ValidationFailedResponse,
};
use crate::application::use_cases::CreateStreamError;
use crate::domain::stream::ValidationError;
use crate::infrastructure::broadcast::BroadcastError;

/// Errors surfaced by HTTP handlers.
///
/// Internal failures are logged where they happen; the response body never
/// carries their details.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Requested resource does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// Event channel is full of subscribers.
    #[error(transparent)]
    SubscriberLimit(BroadcastError),

    /// Unversioned alias that moved under a version prefix.
    #[error("deprecated endpoint /{0}")]
    Deprecated(&'static str),

    /// Version prefix that is not served.
    #[error("unsupported API version {0}")]
    UnsupportedVersion(String),

    /// Anything else.
    #[error("internal server error")]
    Internal,
}

impl From<CreateStreamError> for ApiError {
    fn from(error: CreateStreamError) -> Self {
        match error {
            CreateStreamError::Validation(e) => Self::Validation(e),
            CreateStreamError::Storage(_) | CreateStreamError::Encoding(_) => Self::Internal,
        }
    }
}

impl From<BroadcastError> for ApiError {
    fn from(error: BroadcastError) -> Self {
        match error {
            BroadcastError::SubscriberLimit { .. } => Self::SubscriberLimit(error),
            BroadcastError::ChannelClosed(_) => Self::Internal,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(e) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationFailedResponse {
                    message: "Validation failed",
                    errors: e.into_violations(),
                }),
            )
                .into_response(),
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(MessageResponse::new(message))).into_response()
            }
            Self::SubscriberLimit(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(MessageResponse::new("Too many subscribers for this channel")),
            )
                .into_response(),
            Self::Deprecated(name) => (
                StatusCode::GONE,
                Json(DeprecatedResponse::for_resource(name)),
            )
                .into_response(),
            Self::UnsupportedVersion(version) => (
                StatusCode::BAD_REQUEST,
                Json(UnsupportedVersionResponse::for_version(&version)),
            )
                .into_response(),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new("Internal server error")),
            )
                .into_response(),
        }
    }
}
