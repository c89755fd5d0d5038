use axum::{extract::State, http::StatusCode, Json};

use crate::api::requests::{FeatureFlagRequest, IdempotencyRequest, ValidationError};
use crate::api::responses::{
    ErrorResponse, HealthResponse, MessageResponse, ParameterResponse, ServiceHealth,
    ValidationErrorDetail,
};
use crate::error::{AppError, Result};
use crate::flags::EvaluationContext;
use crate::observability::{mask_sensitive, record_endpoint_hit, record_gate_outcome};

use super::routes::AppState;

/// Liveness endpoint, no external dependencies.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello World"))
}

/// Fetches the configured parameter from the remote parameter store.
pub async fn get_parameters(
    State(state): State<AppState>,
) -> std::result::Result<Json<ParameterResponse>, (StatusCode, Json<ErrorResponse>)> {
    record_endpoint_hit("get_parameters");
    tracing::info!("Getting parameters");

    match state.parameters.get_parameter(&state.parameter_name).await {
        Ok(value) => {
            tracing::debug!(
                parameter = state.parameter_name.as_str(),
                value = mask_sensitive(&value, 2).as_str(),
                "parameter fetched"
            );
            Ok(Json(ParameterResponse {
                parameter_value: value,
            }))
        }
        Err(e) => Err(error_reply(e)),
    }
}

/// Invokes the idempotent call gate with a key derived from the order id.
pub async fn idempotency(
    State(state): State<AppState>,
    Json(request): Json<IdempotencyRequest>,
) -> std::result::Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    record_endpoint_hit("idempotency");
    tracing::info!("Idempotent function");

    let order_id = request.order_id().map_err(validation_reply)?;
    let key = state.gate.generate_key("process_order", &order_id);

    match state
        .gate
        .execute("process_order", &key, move || process_order(order_id))
        .await
    {
        Ok(message) => {
            record_gate_outcome("completed");
            Ok(Json(MessageResponse::new(message)))
        }
        Err(e @ AppError::Conflict(_)) => {
            record_gate_outcome("conflict");
            Err(error_reply(e))
        }
        Err(e) => {
            record_gate_outcome("failed");
            Err(error_reply(e))
        }
    }
}

/// The business operation wrapped by the gate.
async fn process_order(order_id: String) -> Result<String> {
    tracing::info!(order_id = order_id.as_str(), "Processing order");
    Ok(format!("processed order {}", order_id))
}

/// Evaluates the tenant_enabled flag for the requesting tenant.
pub async fn feature_flag(
    State(state): State<AppState>,
    Json(request): Json<FeatureFlagRequest>,
) -> std::result::Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    record_endpoint_hit("feature_flag");
    tracing::info!("Feature Flags function");

    request.validate().map_err(validation_reply)?;

    let context = EvaluationContext::from([(
        "tenant_id".to_string(),
        serde_json::Value::String(request.tenant_id.clone()),
    )]);

    match state
        .feature_flags
        .evaluate("tenant_enabled", &context, false)
        .await
    {
        Ok(true) => Ok(Json(MessageResponse::new("Tenant Enabled"))),
        Ok(false) => Ok(Json(MessageResponse::new("Tenant Disabled"))),
        Err(e) => Err(error_reply(e)),
    }
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis_healthy = state
        .redis_client
        .get_multiplexed_async_connection()
        .await
        .is_ok();

    Json(HealthResponse {
        status: if redis_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        services: ServiceHealth {
            redis: redis_healthy,
        },
    })
}

/// Liveness check endpoint.
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Readiness check endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    let redis_healthy = state
        .redis_client
        .get_multiplexed_async_connection()
        .await
        .is_ok();

    if redis_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint(
    State(state): State<AppState>,
) -> std::result::Result<String, StatusCode> {
    match state.metrics_handle {
        Some(handle) => Ok(handle.render()),
        None => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

fn error_reply(err: AppError) -> (StatusCode, Json<ErrorResponse>) {
    let status = err.status_code();
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {}", err);
        (
            status,
            Json(ErrorResponse::new(err.code(), "An internal error occurred")),
        )
    } else {
        (status, Json(ErrorResponse::new(err.code(), err.to_string())))
    }
}

fn validation_reply(errors: Vec<ValidationError>) -> (StatusCode, Json<ErrorResponse>) {
    let details: Vec<ValidationErrorDetail> = errors
        .iter()
        .map(|e| ValidationErrorDetail {
            field: e.field.clone(),
            message: e.message.clone(),
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(
            ErrorResponse::new("VALIDATION_ERROR", "Request validation failed")
                .with_details(details),
        ),
    )
}
