use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use super::store::StoreError;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics handle already initialized");
            }
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_store_operation<R>(kind: &'static str, operation: &'static str, result: &Result<R, StoreError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(StoreError::NotFound { .. }) => "not_found",
        Err(StoreError::Conflict { .. }) => "conflict",
        Err(StoreError::Unavailable(_)) => "unavailable",
        Err(StoreError::Unsupported(_)) => "unsupported",
    };

    counter!(
        "store_operations_total",
        "kind" => kind,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_event_published(outcome: &'static str) {
    counter!("events_published_total", "outcome" => outcome).increment(1);
}
