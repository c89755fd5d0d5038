use metrics::{counter, describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::Result;

/// Installs the Prometheus recorder and registers metric descriptions.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    describe_counter!(
        "callgate_requests_total",
        Unit::Count,
        "HTTP requests handled, by endpoint"
    );
    describe_counter!(
        "callgate_gate_outcomes_total",
        Unit::Count,
        "Idempotent gate execution outcomes"
    );

    Ok(handle)
}

/// Records a request against one of the service endpoints.
pub fn record_endpoint_hit(endpoint: &str) {
    counter!("callgate_requests_total", "endpoint" => endpoint.to_string()).increment(1);
}

/// Records the outcome of a gate execution: new, duplicate, conflict, failed.
pub fn record_gate_outcome(outcome: &str) {
    counter!("callgate_gate_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}
