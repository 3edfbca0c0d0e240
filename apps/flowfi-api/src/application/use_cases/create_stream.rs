//! Create Stream Use Case
//!
//! Validates a creation request, records the stream intent in the store for
//! the request's data mode, and announces it to the stream's subscribers and
//! to both participants.

use chrono::Utc;
use serde_json::{Map, Value};

use crate::application::ports::{RepositoryError, StreamRepository};
use crate::domain::sandbox::DataMode;
use crate::domain::stream::{StreamIntentRecord, ValidationError, validate_create_stream};
use crate::domain::subscription::{BroadcastKey, STREAM_CREATED};
use crate::infrastructure::broadcast::{PublishReport, SharedBroadcastRegistry};
use crate::infrastructure::metrics;
use crate::infrastructure::persistence::StreamStores;

/// Errors from stream creation.
#[derive(Debug, thiserror::Error)]
pub enum CreateStreamError {
    /// The request body was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failed.
    #[error("failed to store stream intent: {0}")]
    Storage(#[from] RepositoryError),

    /// The record could not be encoded.
    #[error("failed to encode stream intent: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl CreateStreamError {
    /// Check whether the error is the caller's fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// A recorded and announced stream intent.
#[derive(Debug, Clone)]
pub struct CreatedStream {
    /// The stored record.
    pub record: StreamIntentRecord,
    /// JSON body that was broadcast; also the response body.
    pub body: Value,
    /// Delivery outcome across all keys.
    pub report: PublishReport,
}

/// Use case for recording and announcing stream intents.
pub struct CreateStreamUseCase<R>
where
    R: StreamRepository,
{
    registry: SharedBroadcastRegistry,
    stores: StreamStores<R>,
}

impl<R> CreateStreamUseCase<R>
where
    R: StreamRepository,
{
    /// Create a new `CreateStreamUseCase`.
    pub const fn new(registry: SharedBroadcastRegistry, stores: StreamStores<R>) -> Self {
        Self { registry, stores }
    }

    /// Get the store pair this use case writes to.
    #[must_use]
    pub const fn stores(&self) -> &StreamStores<R> {
        &self.stores
    }

    /// Parse a raw request body, then validate, store and announce it.
    ///
    /// An empty body reads as an empty object. A body that is not JSON is
    /// rejected as a violation of field `body`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::execute`].
    pub async fn execute_raw(
        &self,
        body: &[u8],
        mode: DataMode,
    ) -> Result<CreatedStream, CreateStreamError> {
        let payload = parse_body(body).inspect_err(reject)?;
        self.execute(&payload, mode).await
    }

    /// Validate, store and announce a stream intent.
    ///
    /// Nothing is stored or published unless validation passes, and nothing
    /// is published unless the record was stored.
    ///
    /// # Errors
    ///
    /// Returns `CreateStreamError::Validation` for a rejected body, and the
    /// other variants for failures after validation.
    pub async fn execute(
        &self,
        body: &Value,
        mode: DataMode,
    ) -> Result<CreatedStream, CreateStreamError> {
        let input = validate_create_stream(body).inspect_err(reject)?;

        let record = StreamIntentRecord::pending(input);

        self.store_and_publish(record, mode).await.inspect_err(|e| {
            metrics::record_intake_error();
            tracing::error!(error = %e, sandbox = mode.is_sandbox(), "Stream intake failed");
        })
    }

    async fn store_and_publish(
        &self,
        record: StreamIntentRecord,
        mode: DataMode,
    ) -> Result<CreatedStream, CreateStreamError> {
        let body = encode(&record, mode)?;

        self.stores.for_mode(mode).save(&record).await?;

        let keys = broadcast_keys(&record);
        let report = self
            .registry
            .publish_to_many(&keys, STREAM_CREATED, body.clone());

        metrics::record_stream_created(mode);
        tracing::info!(
            stream_id = %record.id,
            sender = %record.sender,
            recipient = %record.recipient,
            sandbox = mode.is_sandbox(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Stream intent recorded"
        );

        Ok(CreatedStream {
            record,
            body,
            report,
        })
    }
}

fn reject(error: &ValidationError) {
    metrics::record_validation_failure();
    tracing::debug!(violations = error.violations().len(), "Stream request rejected");
}

fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| ValidationError::malformed_body(format!("Request body is not valid JSON: {e}")))
}

/// Encode a record, merging the sandbox annotation when in sandbox mode.
///
/// The annotation is stamped once, so broadcast and response agree.
fn encode(record: &StreamIntentRecord, mode: DataMode) -> Result<Value, serde_json::Error> {
    let mut body = serde_json::to_value(record)?;
    if let Some(annotation) = mode.annotation(Utc::now())
        && let Value::Object(map) = &mut body
    {
        map.insert("_sandbox".to_string(), serde_json::to_value(annotation)?);
    }
    Ok(body)
}

/// Keys announced for a new stream: the stream, the sender, the recipient.
///
/// A sender paying themselves is announced to twice.
fn broadcast_keys(record: &StreamIntentRecord) -> [BroadcastKey; 3] {
    [
        BroadcastKey::stream(record.id.as_str()),
        BroadcastKey::user(record.sender.as_str()),
        BroadcastKey::user(record.recipient.as_str()),
    ]
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::infrastructure::broadcast::BroadcastRegistry;
    use crate::infrastructure::persistence::InMemoryStreamRepository;

    fn valid_body() -> Value {
        json!({
            "sender": "S1",
            "recipient": "R1",
            "tokenAddress": "CTOKEN",
            "amount": "1000",
            "duration": 86400
        })
    }

    fn use_case() -> (
        CreateStreamUseCase<InMemoryStreamRepository>,
        SharedBroadcastRegistry,
    ) {
        let registry = Arc::new(BroadcastRegistry::with_defaults());
        let use_case = CreateStreamUseCase::new(Arc::clone(&registry), StreamStores::in_memory());
        (use_case, registry)
    }

    #[tokio::test]
    async fn records_pending_stream() {
        let (use_case, _registry) = use_case();

        let created = use_case
            .execute(&valid_body(), DataMode::Production)
            .await
            .unwrap();

        assert_eq!(created.body["status"], "pending");
        assert_eq!(created.body["sender"], "S1");
        assert_eq!(created.body["amount"], "1000");
        assert_eq!(created.body["duration"], 86400);
        assert!(!created.record.id.is_empty());
        assert!(created.body.get("_sandbox").is_none());

        let stored = use_case
            .stores()
            .for_mode(DataMode::Production)
            .find_by_id(&created.record.id)
            .await
            .unwrap();
        assert_eq!(stored, Some(created.record));
    }

    #[tokio::test]
    async fn announces_to_stream_and_both_users() {
        let (use_case, registry) = use_case();
        let mut sender = registry.open(BroadcastKey::user("S1")).unwrap();
        let mut recipient = registry.open(BroadcastKey::user("R1")).unwrap();

        let created = use_case
            .execute(&valid_body(), DataMode::Production)
            .await
            .unwrap();
        assert_eq!(created.report.delivered, 2);

        let to_sender = sender.try_recv().unwrap();
        let to_recipient = recipient.try_recv().unwrap();
        assert_eq!(&*to_sender.name, STREAM_CREATED);
        assert_eq!(*to_sender.payload, created.body);
        assert_eq!(to_sender.payload, to_recipient.payload);
        assert!(sender.try_recv().is_none());
        assert!(recipient.try_recv().is_none());
    }

    #[tokio::test]
    async fn self_stream_notifies_user_as_sender_and_recipient() {
        let (use_case, registry) = use_case();
        let mut user = registry.open(BroadcastKey::user("S1")).unwrap();

        let mut body = valid_body();
        body["recipient"] = json!("S1");
        let created = use_case.execute(&body, DataMode::Production).await.unwrap();

        assert_eq!(created.report.delivered, 2);
        assert!(user.try_recv().is_some());
        assert!(user.try_recv().is_some());
        assert!(user.try_recv().is_none());
    }

    #[tokio::test]
    async fn raw_body_parsed_before_validation() {
        let (use_case, registry) = use_case();
        let mut sender = registry.open(BroadcastKey::user("S1")).unwrap();

        let err = use_case
            .execute_raw(b"{not json", DataMode::Production)
            .await
            .unwrap_err();
        match err {
            CreateStreamError::Validation(e) => assert_eq!(e.violations()[0].field, "body"),
            other => panic!("unexpected error: {other}"),
        }

        let err = use_case
            .execute_raw(b"  \n", DataMode::Production)
            .await
            .unwrap_err();
        match err {
            CreateStreamError::Validation(e) => assert_eq!(e.violations().len(), 5),
            other => panic!("unexpected error: {other}"),
        }

        let created = use_case
            .execute_raw(&serde_json::to_vec(&valid_body()).unwrap(), DataMode::Production)
            .await
            .unwrap();
        assert_eq!(*sender.try_recv().unwrap().payload, created.body);
    }

    #[test]
    fn empty_body_reads_as_object() {
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
        assert!(parse_body(b"{not json").is_err());
    }

    #[tokio::test]
    async fn invalid_body_has_no_side_effects() {
        let (use_case, registry) = use_case();
        let mut sender = registry.open(BroadcastKey::user("S1")).unwrap();

        let mut body = valid_body();
        body["amount"] = json!("-10");
        let err = use_case
            .execute(&body, DataMode::Production)
            .await
            .unwrap_err();

        assert!(err.is_client_error());
        assert!(sender.try_recv().is_none());
        assert_eq!(
            use_case
                .stores()
                .for_mode(DataMode::Production)
                .count()
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn sandbox_annotated_and_isolated() {
        let (use_case, registry) = use_case();
        let mut recipient = registry.open(BroadcastKey::user("R1")).unwrap();

        let created = use_case
            .execute(&valid_body(), DataMode::Sandbox)
            .await
            .unwrap();

        assert_eq!(created.body["_sandbox"]["mode"], true);
        let event = recipient.try_recv().unwrap();
        assert_eq!(*event.payload, created.body);

        let stores = use_case.stores();
        assert_eq!(stores.for_mode(DataMode::Sandbox).count().await.unwrap(), 1);
        assert_eq!(stores.for_mode(DataMode::Production).count().await.unwrap(), 0);
    }

    struct FailingRepository;

    #[async_trait]
    impl StreamRepository for FailingRepository {
        async fn save(&self, _record: &StreamIntentRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Unavailable("disk on fire".to_string()))
        }

        async fn find_by_id(
            &self,
            _id: &str,
        ) -> Result<Option<StreamIntentRecord>, RepositoryError> {
            Ok(None)
        }

        async fn count(&self) -> Result<usize, RepositoryError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn storage_failure_skips_broadcast() {
        let registry = Arc::new(BroadcastRegistry::with_defaults());
        let stores = StreamStores::new(Arc::new(FailingRepository), Arc::new(FailingRepository));
        let use_case = CreateStreamUseCase::new(Arc::clone(&registry), stores);
        let mut sender = registry.open(BroadcastKey::user("S1")).unwrap();

        let err = use_case
            .execute(&valid_body(), DataMode::Production)
            .await
            .unwrap_err();

        assert!(matches!(err, CreateStreamError::Storage(_)));
        assert!(!err.is_client_error());
        assert!(sender.try_recv().is_none());
    }

    #[test]
    fn keys_cover_stream_sender_and_recipient() {
        let mut record = StreamIntentRecord::with_id(
            "s-1".to_string(),
            validate_create_stream(&valid_body()).unwrap(),
        );
        assert_eq!(
            broadcast_keys(&record),
            [
                BroadcastKey::stream("s-1"),
                BroadcastKey::user("S1"),
                BroadcastKey::user("R1"),
            ]
        );

        record.recipient = "S1".to_string();
        assert_eq!(
            broadcast_keys(&record),
            [
                BroadcastKey::stream("s-1"),
                BroadcastKey::user("S1"),
                BroadcastKey::user("S1"),
            ]
        );
    }
}
