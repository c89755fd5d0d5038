#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use callgate::api::AppState;
use callgate::error::{AppError, Result};
use callgate::flags::{FeatureFlags, FlagProvider, FlagsDocument};
use callgate::idempotency::{
    ConflictPolicy, GateConfig, IdempotencyGate, IdempotencyStore, InMemoryIdempotencyStore,
};
use callgate::params::ParameterProvider;

pub const TEST_PARAMETER_NAME: &str = "/lambda-powertools/container";
pub const TEST_PARAMETER_VALUE: &str = "value-from-store";

/// Parameter provider serving a fixed map, standing in for the remote store.
pub struct StaticParameterStore {
    parameters: HashMap<String, String>,
}

impl StaticParameterStore {
    pub fn new() -> Self {
        Self {
            parameters: HashMap::from([(
                TEST_PARAMETER_NAME.to_string(),
                TEST_PARAMETER_VALUE.to_string(),
            )]),
        }
    }

    pub fn empty() -> Self {
        Self {
            parameters: HashMap::new(),
        }
    }
}

#[async_trait]
impl ParameterProvider for StaticParameterStore {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        self.parameters
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("parameter {} does not exist", name)))
    }
}

/// Flag provider serving a fixed document, standing in for the remote store.
pub struct StaticFlagStore {
    document: FlagsDocument,
}

impl StaticFlagStore {
    pub fn new(document: FlagsDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl FlagProvider for StaticFlagStore {
    async fn fetch_flags(&self) -> Result<FlagsDocument> {
        Ok(self.document.clone())
    }
}

/// Flags document enabling tenant "xyz" and nobody else.
pub fn tenant_flags() -> FlagsDocument {
    serde_json::from_value(serde_json::json!({
        "tenant_enabled": {
            "default": false,
            "rules": {
                "tenant xyz is enabled": {
                    "when_match": true,
                    "conditions": [
                        {"action": "EQUALS", "key": "tenant_id", "value": "xyz"}
                    ]
                }
            }
        }
    }))
    .unwrap()
}

/// Gate over a fresh in-memory store.
pub fn gate_with(policy: ConflictPolicy, ttl_seconds: i64) -> IdempotencyGate {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    gate_over(store, policy, ttl_seconds)
}

pub fn gate_over(
    store: Arc<dyn IdempotencyStore>,
    policy: ConflictPolicy,
    ttl_seconds: i64,
) -> IdempotencyGate {
    IdempotencyGate::new(
        store,
        GateConfig {
            ttl_seconds,
            key_prefix: "test".to_string(),
            conflict_policy: policy,
            poll_interval_ms: 20,
            max_wait_ms: 2000,
        },
    )
}

/// Application state over in-memory stores and stub providers.
///
/// The Redis client is constructed lazily and never connected; handlers under
/// test only touch the in-memory gate and the stubs.
pub fn test_state() -> (AppState, Arc<InMemoryIdempotencyStore>) {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let gate = gate_over(store.clone(), ConflictPolicy::Fail, 3600);

    let redis_client =
        redis::Client::open("redis://127.0.0.1:6379").expect("valid redis url");
    let parameters = Arc::new(StaticParameterStore::new());
    let feature_flags = FeatureFlags::new(Arc::new(StaticFlagStore::new(tenant_flags())));

    let state = AppState::new(
        redis_client,
        parameters,
        feature_flags,
        Arc::new(gate),
        TEST_PARAMETER_NAME,
    );

    (state, store)
}
