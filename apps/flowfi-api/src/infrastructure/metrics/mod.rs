//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Intake**: Streams created, validation failures, persistence errors
//! - **Delivery**: Events delivered to and dropped for subscribers
//! - **Subscribers**: Live subscriber gauge, pruned and rejected subscribers
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the API port. Recording before
//! [`init_metrics`] is a no-op.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::sandbox::DataMode;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Repeated calls return the handle installed by the first call.
///
/// # Panics
///
/// Panics if another global recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            #[allow(clippy::expect_used)]
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Intake
    describe_counter!(
        "flowfi_streams_created_total",
        "Total stream intents recorded, by data mode"
    );
    describe_counter!(
        "flowfi_validation_failures_total",
        "Total stream creation requests rejected by validation"
    );
    describe_counter!(
        "flowfi_intake_errors_total",
        "Total stream creation requests that failed after validation"
    );

    // Delivery
    describe_counter!(
        "flowfi_events_delivered_total",
        "Total events enqueued for subscribers"
    );
    describe_counter!(
        "flowfi_events_dropped_total",
        "Total events dropped because a subscriber buffer was full"
    );

    // Subscribers
    describe_gauge!("flowfi_subscribers", "Number of live event subscribers");
    describe_counter!(
        "flowfi_subscribers_pruned_total",
        "Total subscribers removed after their connection closed"
    );
    describe_counter!(
        "flowfi_subscriptions_rejected_total",
        "Total subscription attempts rejected at the per-key limit"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a stream intent recorded in the given data mode.
pub fn record_stream_created(mode: DataMode) {
    counter!("flowfi_streams_created_total", "mode" => mode.as_str()).increment(1);
}

/// Record a creation request rejected by validation.
pub fn record_validation_failure() {
    counter!("flowfi_validation_failures_total").increment(1);
}

/// Record a creation request that failed after validation.
pub fn record_intake_error() {
    counter!("flowfi_intake_errors_total").increment(1);
}

/// Record events enqueued for subscribers.
pub fn record_events_delivered(event: &str, count: u64) {
    if count == 0 {
        return;
    }
    counter!("flowfi_events_delivered_total", "event" => event.to_string()).increment(count);
}

/// Record events dropped for subscribers with full buffers.
pub fn record_events_dropped(event: &str, count: u64) {
    if count == 0 {
        return;
    }
    counter!("flowfi_events_dropped_total", "event" => event.to_string()).increment(count);
}

/// Record subscribers pruned after their receiver closed.
pub fn record_subscribers_pruned(count: u64) {
    if count == 0 {
        return;
    }
    counter!("flowfi_subscribers_pruned_total").increment(count);
}

/// Record a subscription attempt rejected at the per-key limit.
pub fn record_subscription_rejected() {
    counter!("flowfi_subscriptions_rejected_total").increment(1);
}

/// Update the live subscriber gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscribers(count: usize) {
    gauge!("flowfi_subscribers").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
