mod common;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use callgate::api::handlers;
use callgate::api::requests::{FeatureFlagRequest, IdempotencyRequest};
use callgate::api::AppState;
use callgate::flags::FeatureFlags;

#[tokio::test]
async fn test_root_returns_hello_world() {
    let Json(body) = handlers::root().await;
    assert_eq!(body.message, "Hello World");
}

#[tokio::test]
async fn test_get_parameters_returns_stored_value() {
    let (state, _) = common::test_state();

    let Json(body) = handlers::get_parameters(State(state)).await.unwrap();
    assert_eq!(body.parameter_value, common::TEST_PARAMETER_VALUE);
}

#[tokio::test]
async fn test_get_parameters_missing_upstream_is_404() {
    let (state, _) = common::test_state();
    let state = AppState {
        parameters: Arc::new(common::StaticParameterStore::empty()),
        ..state
    };

    let (status, Json(error)) = handlers::get_parameters(State(state)).await.unwrap_err();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error.code, "NOT_FOUND");
}

#[tokio::test]
async fn test_idempotency_endpoint_repeat_call_returns_same_message() {
    let (state, store) = common::test_state();

    let request: IdempotencyRequest =
        serde_json::from_value(serde_json::json!({"order": {"id": 1}})).unwrap();

    let Json(first) = handlers::idempotency(State(state.clone()), Json(request.clone()))
        .await
        .unwrap();
    let Json(second) = handlers::idempotency(State(state.clone()), Json(request))
        .await
        .unwrap();

    assert_eq!(first.message, "processed order 1");
    assert_eq!(second.message, "processed order 1");
    assert_eq!(store.len(), 1, "both calls must share one record");

    let snapshot = state.gate.metrics().snapshot();
    assert_eq!(snapshot.new_requests, 1, "operation logic must run once");
    assert_eq!(snapshot.duplicate_requests, 1);
}

#[tokio::test]
async fn test_idempotency_endpoint_rejects_missing_order_id() {
    let (state, _) = common::test_state();

    let request: IdempotencyRequest =
        serde_json::from_value(serde_json::json!({"order": {"id": null}})).unwrap();

    let (status, Json(error)) = handlers::idempotency(State(state), Json(request))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.code, "VALIDATION_ERROR");
    assert!(error.details.is_some());
}

#[tokio::test]
async fn test_feature_flag_endpoint_enables_matching_tenant() {
    let (state, _) = common::test_state();

    let Json(body) = handlers::feature_flag(
        State(state),
        Json(FeatureFlagRequest {
            tenant_id: "xyz".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body.message, "Tenant Enabled");
}

#[tokio::test]
async fn test_feature_flag_endpoint_disables_unknown_tenant() {
    let (state, _) = common::test_state();

    let Json(body) = handlers::feature_flag(
        State(state),
        Json(FeatureFlagRequest {
            tenant_id: "somebody-else".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body.message, "Tenant Disabled");
}

#[tokio::test]
async fn test_feature_flag_endpoint_missing_flag_document_disables() {
    let (state, _) = common::test_state();
    let state = AppState {
        feature_flags: FeatureFlags::new(Arc::new(common::StaticFlagStore::new(
            Default::default(),
        ))),
        ..state
    };

    let Json(body) = handlers::feature_flag(
        State(state),
        Json(FeatureFlagRequest {
            tenant_id: "xyz".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(body.message, "Tenant Disabled");
}

#[tokio::test]
async fn test_feature_flag_endpoint_rejects_empty_tenant() {
    let (state, _) = common::test_state();

    let (status, Json(error)) = handlers::feature_flag(
        State(state),
        Json(FeatureFlagRequest {
            tenant_id: "".to_string(),
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error.code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder_is_unavailable() {
    let (state, _) = common::test_state();

    let result = handlers::metrics_endpoint(State(state)).await;
    assert_eq!(result.unwrap_err(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_liveness_is_always_ok() {
    assert_eq!(handlers::liveness_check().await, StatusCode::OK);
}
