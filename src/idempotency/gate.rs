use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::idempotency::key_generator::{IdempotencyKeyGenerator, KeyGeneratorConfig};
use crate::idempotency::storage::{IdempotencyRecord, IdempotencyStatus, IdempotencyStore};

/// Policy applied when a second call arrives while a record is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail immediately with a conflict so the caller can retry later.
    Fail,
    /// Poll the store until the in-flight call resolves or `max_wait` elapses.
    Wait,
}

/// Configuration for the idempotent call gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub ttl_seconds: i64,
    pub key_prefix: String,
    pub conflict_policy: ConflictPolicy,
    pub poll_interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86400, // 24 hours
            key_prefix: "idem".to_string(),
            conflict_policy: ConflictPolicy::Fail,
            poll_interval_ms: 100,
            max_wait_ms: 5000,
        }
    }
}

/// Metrics for gate executions.
#[derive(Debug, Default)]
pub struct IdempotencyMetrics {
    pub total_requests: AtomicU64,
    pub duplicate_requests: AtomicU64,
    pub new_requests: AtomicU64,
    pub completed_requests: AtomicU64,
    pub failed_requests: AtomicU64,
}

impl IdempotencyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_new(&self) {
        self.new_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.completed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            duplicate_requests: self.duplicate_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
            completed_requests: self.completed_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub duplicate_requests: u64,
    pub new_requests: u64,
    pub completed_requests: u64,
    pub failed_requests: u64,
}

impl MetricsSnapshot {
    pub fn duplicate_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.duplicate_requests as f64 / self.total_requests as f64
        }
    }
}

/// Idempotent call gate.
///
/// Wraps a caller-supplied operation so that repeated or concurrent
/// invocations with the same key execute the operation at most once within
/// the TTL window; every completed call returns the stored result.
pub struct IdempotencyGate {
    store: Arc<dyn IdempotencyStore>,
    key_generator: IdempotencyKeyGenerator,
    metrics: Arc<IdempotencyMetrics>,
    config: GateConfig,
}

impl IdempotencyGate {
    pub fn new(store: Arc<dyn IdempotencyStore>, config: GateConfig) -> Self {
        let key_generator = IdempotencyKeyGenerator::new(KeyGeneratorConfig {
            key_prefix: config.key_prefix.clone(),
        });

        Self {
            store,
            key_generator,
            metrics: Arc::new(IdempotencyMetrics::new()),
            config,
        }
    }

    pub fn metrics(&self) -> Arc<IdempotencyMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Derives an idempotency key from an operation name and a caller value.
    pub fn generate_key(&self, operation: &str, value: &str) -> String {
        self.key_generator.generate(operation, value)
    }

    /// Executes the callable at most once for `key` within the TTL window.
    ///
    /// `operation` names the unit of work for the stored record; `call`
    /// produces its result. A repeat call within the window returns the
    /// stored result without running the callable. A call that arrives while
    /// another is in flight is handled per the configured [`ConflictPolicy`].
    /// A callable failure removes the record so the key may be retried, and
    /// the error is propagated unchanged.
    pub async fn execute<T, F, Fut>(&self, operation: &str, key: &str, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if key.is_empty() {
            return Err(AppError::Validation(
                "idempotency key cannot be empty".to_string(),
            ));
        }

        self.metrics.record_request();
        let started = Instant::now();

        loop {
            let record = IdempotencyRecord::new(
                key.to_string(),
                operation.to_string(),
                self.config.ttl_seconds,
            );

            match self.store.try_acquire(&record).await? {
                None => {
                    self.metrics.record_new();
                    return self.run(key, call).await;
                }
                Some(existing) if existing.is_expired() => {
                    // Stale record the store did not evict; clear and retry.
                    self.store.remove(key).await?;
                    continue;
                }
                Some(existing) => match existing.status {
                    IdempotencyStatus::Completed => {
                        self.metrics.record_duplicate();
                        return Self::decode_result(existing);
                    }
                    IdempotencyStatus::InProgress => match self.config.conflict_policy {
                        ConflictPolicy::Fail => {
                            self.metrics.record_duplicate();
                            return Err(AppError::Conflict(format!(
                                "a call with key {} is already in progress",
                                key
                            )));
                        }
                        ConflictPolicy::Wait => {
                            if started.elapsed().as_millis() as u64 >= self.config.max_wait_ms {
                                self.metrics.record_duplicate();
                                return Err(AppError::Conflict(format!(
                                    "timed out waiting for in-flight call with key {}",
                                    key
                                )));
                            }
                            tokio::time::sleep(std::time::Duration::from_millis(
                                self.config.poll_interval_ms,
                            ))
                            .await;
                        }
                    },
                },
            }
        }
    }

    async fn run<T, F, Fut>(&self, key: &str, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match call().await {
            Ok(value) => {
                let result =
                    serde_json::to_value(&value).map_err(AppError::Serialization)?;
                if let Err(e) = self.store.complete(key, result).await {
                    tracing::error!(key, error = %e, "failed to persist completed record");
                }
                self.metrics.record_completed();
                Ok(value)
            }
            Err(e) => {
                // Remove the in-progress record so the key may be retried.
                if let Err(remove_err) = self.store.remove(key).await {
                    tracing::error!(key, error = %remove_err, "failed to remove record after failure");
                }
                self.metrics.record_failed();
                Err(e)
            }
        }
    }

    fn decode_result<T: DeserializeOwned>(record: IdempotencyRecord) -> Result<T> {
        let Some(result) = record.result else {
            return Err(AppError::Internal(anyhow::anyhow!(
                "completed record for key {} has no stored result",
                record.key
            )));
        };
        serde_json::from_value(result).map_err(AppError::Serialization)
    }
}
