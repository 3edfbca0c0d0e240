//! Sandbox mode resolution.
//!
//! Middleware deciding per request whether it runs against sandbox data,
//! and the extractor handlers use to read that decision.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Uri};
use axum::middleware::Next;
use axum::response::Response;

use crate::domain::sandbox::DataMode;
use crate::infrastructure::config::SandboxSettings;

/// Response header naming the data environment.
pub const ENVIRONMENT_HEADER: &str = "x-environment";

/// Response header set on sandbox responses.
pub const SANDBOX_HEADER: &str = "x-sandbox-mode";

/// Resolve the data mode for a request.
///
/// Sandbox is only possible when globally enabled. The header is checked
/// before the query parameter; either accepts `true` or `1`.
#[must_use]
pub fn resolve_mode(settings: &SandboxSettings, headers: &HeaderMap, uri: &Uri) -> DataMode {
    if !settings.enabled {
        return DataMode::Production;
    }

    if settings.allow_header
        && headers
            .get(settings.header_name.as_str())
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_truthy)
    {
        return DataMode::Sandbox;
    }

    if settings.allow_query_param
        && Query::<HashMap<String, String>>::try_from_uri(uri)
            .ok()
            .and_then(|Query(params)| params.get(&settings.query_param_name).cloned())
            .is_some_and(|v| is_truthy(&v))
    {
        return DataMode::Sandbox;
    }

    DataMode::Production
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Middleware attaching the resolved `DataMode` to the request and the
/// environment headers to the response.
///
/// Environment headers are only written while sandbox mode is enabled.
pub async fn resolve_data_mode(
    State(settings): State<Arc<SandboxSettings>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mode = resolve_mode(&settings, request.headers(), request.uri());
    request.extensions_mut().insert(mode);

    let mut response = next.run(request).await;
    if !settings.enabled {
        return response;
    }
    let headers = response.headers_mut();
    headers.insert(ENVIRONMENT_HEADER, HeaderValue::from_static(mode.as_str()));
    if mode.is_sandbox() {
        headers.insert(SANDBOX_HEADER, HeaderValue::from_static("true"));
    }
    response
}

/// Extractor for the request's data mode.
///
/// Falls back to `DataMode::Production` when the middleware did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestMode(pub DataMode);

impl<S> FromRequestParts<S> for RequestMode
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<DataMode>()
                .copied()
                .unwrap_or_default(),
        ))
    }
}
