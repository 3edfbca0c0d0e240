//! HTTP Controller (Driver Adapter)
//!
//! Axum router for the stream API: versioned intake and read-back routes,
//! server-sent event subscriptions, deprecated aliases, and health.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, Uri},
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{any, get, post},
};
use futures::{Stream, StreamExt};
use serde_json::Value;

use super::error::ApiError;
use super::health::{health_handler, liveness_handler, metrics_handler, root_handler};
use super::response::SUPPORTED_VERSIONS;
use super::sandbox::{RequestMode, resolve_data_mode};
use crate::application::ports::StreamRepository;
use crate::application::use_cases::CreateStreamUseCase;
use crate::domain::stream::StreamIntentRecord;
use crate::domain::subscription::{BroadcastEvent, BroadcastKey};
use crate::infrastructure::broadcast::SharedBroadcastRegistry;
use crate::infrastructure::config::{ApiConfig, SandboxSettings};
use crate::infrastructure::persistence::StreamStores;

// =============================================================================
// State
// =============================================================================

/// Application state shared across handlers.
pub struct AppState<R>
where
    R: StreamRepository,
{
    /// Use case for recording stream intents.
    pub create_stream: Arc<CreateStreamUseCase<R>>,
    /// Registry SSE clients subscribe to.
    pub registry: SharedBroadcastRegistry,
    /// Sandbox resolution settings.
    pub sandbox: Arc<SandboxSettings>,
    /// Interval between SSE keep-alive comments.
    pub keep_alive_interval: Duration,
    /// Application version.
    pub version: String,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl<R> Clone for AppState<R>
where
    R: StreamRepository,
{
    fn clone(&self) -> Self {
        Self {
            create_stream: Arc::clone(&self.create_stream),
            registry: Arc::clone(&self.registry),
            sandbox: Arc::clone(&self.sandbox),
            keep_alive_interval: self.keep_alive_interval,
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

impl<R> AppState<R>
where
    R: StreamRepository,
{
    /// Wire up state from its collaborators.
    #[must_use]
    pub fn new(
        config: &ApiConfig,
        registry: SharedBroadcastRegistry,
        stores: StreamStores<R>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            create_stream: Arc::new(CreateStreamUseCase::new(Arc::clone(&registry), stores)),
            registry,
            sandbox: Arc::new(config.sandbox.clone()),
            keep_alive_interval: config.broadcast.keep_alive_interval,
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// Router
// =============================================================================

/// Create the HTTP router with all endpoints.
pub fn create_router<R>(state: AppState<R>) -> Router
where
    R: StreamRepository + 'static,
{
    let v1: Router<AppState<R>> = Router::new()
        .route("/streams", post(create_stream))
        .route("/streams/{id}", get(get_stream))
        .route("/events/streams/{stream_id}", get(stream_events))
        .route("/events/users/{user_id}", get(user_events));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/v1", v1)
        .route("/streams", any(deprecated_streams))
        .route("/streams/{*rest}", any(deprecated_streams))
        .route("/events", any(deprecated_events))
        .route("/events/{*rest}", any(deprecated_events))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.sandbox),
            resolve_data_mode,
        ))
        .with_state(state)
}

// =============================================================================
// Streams
// =============================================================================

/// Record a stream intent and announce it.
async fn create_stream<R>(
    State(state): State<AppState<R>>,
    RequestMode(mode): RequestMode,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
    R: StreamRepository,
{
    let created = state.create_stream.execute_raw(&body, mode).await?;
    Ok((StatusCode::CREATED, Json(created.body)))
}

/// Read back a stream intent from the request's data mode.
async fn get_stream<R>(
    State(state): State<AppState<R>>,
    RequestMode(mode): RequestMode,
    Path(id): Path<String>,
) -> Result<Json<StreamIntentRecord>, ApiError>
where
    R: StreamRepository,
{
    let repository = state.create_stream.stores().for_mode(mode);
    match repository.find_by_id(&id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(ApiError::NotFound("Stream not found")),
        Err(e) => {
            tracing::error!(stream_id = %id, error = %e, "Failed to load stream");
            Err(ApiError::Internal)
        }
    }
}

// =============================================================================
// Events
// =============================================================================

async fn stream_events<R>(
    State(state): State<AppState<R>>,
    Path(stream_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
    R: StreamRepository,
{
    open_event_stream(&state, BroadcastKey::stream(stream_id))
}

async fn user_events<R>(
    State(state): State<AppState<R>>,
    Path(user_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
    R: StreamRepository,
{
    open_event_stream(&state, BroadcastKey::user(user_id))
}

/// Subscribe to `key` for the lifetime of the response body.
fn open_event_stream<R>(
    state: &AppState<R>,
    key: BroadcastKey,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<R>>, ApiError>
where
    R: StreamRepository,
{
    let subscription = state.registry.open(key)?;
    tracing::info!(
        key = %subscription.handle().key(),
        subscription_id = subscription.handle().id(),
        "Event stream opened"
    );

    let events = subscription.map(|event| Ok(to_sse_event(&event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.keep_alive_interval)))
}

fn to_sse_event(event: &BroadcastEvent) -> Event {
    Event::default()
        .event(&*event.name)
        .data(event.payload.to_string())
}

// =============================================================================
// Versioning and Fallbacks
// =============================================================================

async fn deprecated_streams() -> ApiError {
    ApiError::Deprecated("streams")
}

async fn deprecated_events() -> ApiError {
    ApiError::Deprecated("events")
}

async fn fallback(uri: Uri) -> ApiError {
    match requested_version(uri.path()) {
        Some(version) if !SUPPORTED_VERSIONS.contains(&version) => {
            ApiError::UnsupportedVersion(version.to_string())
        }
        _ => ApiError::NotFound("Not found"),
    }
}

/// Get the leading `v<digits>` path segment, if any.
fn requested_version(path: &str) -> Option<&str> {
    let first = path.split('/').find(|segment| !segment.is_empty())?;
    let digits = first.strip_prefix('v')?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(first)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::FromRequestParts;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::sandbox::DataMode;
    use crate::infrastructure::broadcast::BroadcastRegistry;
    use crate::infrastructure::persistence::InMemoryStreamRepository;

    fn test_state(config: &ApiConfig) -> AppState<InMemoryStreamRepository> {
        AppState::new(
            config,
            Arc::new(BroadcastRegistry::with_defaults()),
            StreamStores::in_memory(),
            "1.0.0-test",
        )
    }

    fn sandbox_config() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.sandbox.enabled = true;
        config
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_stream(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "sender": "S1",
            "recipient": "R1",
            "tokenAddress": "CTOKEN",
            "amount": "1000",
            "duration": 3600
        })
    }

    #[test]
    fn version_segment_detection() {
        assert_eq!(requested_version("/v2/streams"), Some("v2"));
        assert_eq!(requested_version("/v10"), Some("v10"));
        assert_eq!(requested_version("/v1/streams"), Some("v1"));
        assert_eq!(requested_version("/vx/streams"), None);
        assert_eq!(requested_version("/v/streams"), None);
        assert_eq!(requested_version("/"), None);
        assert_eq!(requested_version("/verbose"), None);
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let state = test_state(&ApiConfig::default());
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(post_stream("/v1/streams", &valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get("x-environment").is_none());
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/streams/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);
    }

    #[tokio::test]
    async fn unknown_stream_is_404() {
        let app = create_router(test_state(&ApiConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/streams/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Stream not found" })
        );
    }

    #[tokio::test]
    async fn malformed_json_is_validation_failure() {
        let app = create_router(test_state(&ApiConfig::default()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/streams")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"sender\":"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "body");
    }

    #[tokio::test]
    async fn sandbox_records_hidden_from_production() {
        let app = create_router(test_state(&sandbox_config()));

        let response = app
            .clone()
            .oneshot(post_stream("/v1/streams?sandbox=true", &valid_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-sandbox-mode").unwrap(), "true");
        assert_eq!(response.headers().get("x-environment").unwrap(), "sandbox");
        let created = body_json(response).await;
        assert_eq!(created["_sandbox"]["mode"], true);
        let id = created["id"].as_str().unwrap().to_string();

        let production = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/streams/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(production.status(), StatusCode::NOT_FOUND);

        let sandbox = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/streams/{id}"))
                    .header("X-Sandbox-Mode", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(sandbox.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn subscriber_cap_returns_503() {
        let mut config = ApiConfig::default();
        config.broadcast.max_subscribers_per_key = 1;
        let registry = Arc::new(BroadcastRegistry::new(config.broadcast.clone().into()));
        let state = AppState::new(
            &config,
            Arc::clone(&registry),
            StreamStores::in_memory(),
            "1.0.0-test",
        );
        let _held = registry.open(BroadcastKey::user("S1")).unwrap();

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/events/users/S1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Too many subscribers for this channel" })
        );
    }

    #[tokio::test]
    async fn event_route_registers_subscriber() {
        let state = test_state(&ApiConfig::default());
        let registry = Arc::clone(&state.registry);

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/events/streams/s-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );
        assert_eq!(registry.subscriber_count(&BroadcastKey::stream("s-1")), 1);

        drop(response);
        assert_eq!(registry.total_subscribers(), 0);
    }

    #[tokio::test]
    async fn missing_mode_extension_defaults_to_production() {
        let (mut parts, ()) = Request::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts();

        let RequestMode(mode) = RequestMode::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(mode, DataMode::Production);
    }

    #[tokio::test]
    async fn fallback_routes() {
        let app = create_router(test_state(&ApiConfig::default()));

        let cases = [
            ("/streams", StatusCode::GONE),
            ("/streams/abc", StatusCode::GONE),
            ("/events/users/S1", StatusCode::GONE),
            ("/v2/streams", StatusCode::BAD_REQUEST),
            ("/v1/nothing-here", StatusCode::NOT_FOUND),
            ("/nothing-here", StatusCode::NOT_FOUND),
            ("/healthz", StatusCode::OK),
            ("/", StatusCode::OK),
        ];

        for (uri, status) in cases {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), status, "{uri}");
        }
    }

    #[tokio::test]
    async fn health_reports_versions_and_subscribers() {
        let state = test_state(&ApiConfig::default());
        let _subscription = state.registry.open(BroadcastKey::user("S1")).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "1.0.0-test");
        assert_eq!(body["apiVersions"]["supported"], json!(["v1"]));
        assert_eq!(body["apiVersions"]["default"], "v1");
        assert_eq!(body["subscribers"], 1);
    }
}
