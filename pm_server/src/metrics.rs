//! Prometheus metrics for tracker observability.

use metrics::counter;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a version-checked write that lost a race and was retried.
pub fn write_conflict(collection: &str) {
    counter!("pm_write_conflicts_total", "collection" => collection.to_string()).increment(1);
}

/// Record a login or registration attempt.
pub fn auth_attempt(kind: &str, outcome: &str) {
    counter!(
        "pm_auth_attempts_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a resource allocation change.
pub fn allocation(action: &str, outcome: &str) {
    counter!(
        "pm_allocations_total",
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an approval workflow action.
pub fn approval_action(action: &str) {
    counter!("pm_approval_actions_total", "action" => action.to_string()).increment(1);
}

/// Record a collection export.
pub fn export(kind: &str, format: &str) {
    counter!(
        "pm_exports_total",
        "kind" => kind.to_string(),
        "format" => format.to_string()
    )
    .increment(1);
}
