use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use super::handlers;
use crate::flags::FeatureFlags;
use crate::idempotency::IdempotencyGate;
use crate::params::ParameterProvider;

/// Application state shared across handlers.
///
/// Clients are constructed once at startup and injected here; handlers never
/// build their own.
#[derive(Clone)]
pub struct AppState {
    pub redis_client: redis::Client,
    pub parameters: Arc<dyn ParameterProvider>,
    pub feature_flags: FeatureFlags,
    pub gate: Arc<IdempotencyGate>,
    /// Name of the parameter served by GET /get_parameters/.
    pub parameter_name: String,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        redis_client: redis::Client,
        parameters: Arc<dyn ParameterProvider>,
        feature_flags: FeatureFlags,
        gate: Arc<IdempotencyGate>,
        parameter_name: impl Into<String>,
    ) -> Self {
        Self {
            redis_client,
            parameters,
            feature_flags,
            gate,
            parameter_name: parameter_name.into(),
            metrics_handle: None,
        }
    }

    /// Adds metrics handle to the state.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/get_parameters/", get(handlers::get_parameters))
        .route("/idempotency/", post(handlers::idempotency))
        .route("/feature_flag/", post(handlers::feature_flag))
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/live", get(handlers::liveness_check))
        .route("/ready", get(handlers::readiness_check))
        // Metrics endpoint
        .route("/metrics", get(handlers::metrics_endpoint))
        .with_state(state)
}
