use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Status of an idempotency record.
///
/// Expiry is not a stored status: a record whose `expires_at` has elapsed is
/// treated as absent everywhere (see [`IdempotencyRecord::is_expired`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdempotencyStatus {
    InProgress,
    Completed,
}

/// Stored idempotency record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub key: String,
    pub operation: String,
    pub status: IdempotencyStatus,
    pub result: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IdempotencyRecord {
    pub fn new(key: String, operation: String, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            key,
            operation,
            status: IdempotencyStatus::InProgress,
            result: None,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds),
            completed_at: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == IdempotencyStatus::Completed
    }
}

/// Persisted backing store for idempotency records.
///
/// All cross-instance coordination goes through `try_acquire`, the store's
/// atomic create-if-absent primitive. There must be no in-process locking of
/// keys: multiple service instances share the same store.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Attempts to create the record if no live record exists for its key.
    ///
    /// Returns `Ok(None)` when the record was created (the caller owns the
    /// execution), or `Ok(Some(existing))` when a live record already exists.
    async fn try_acquire(&self, record: &IdempotencyRecord)
        -> Result<Option<IdempotencyRecord>>;

    /// Finds a live record by key. Expired records are reported as absent.
    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>>;

    /// Marks the record as completed and persists the operation result.
    async fn complete(
        &self,
        key: &str,
        result: serde_json::Value,
    ) -> Result<Option<IdempotencyRecord>>;

    /// Removes the record, allowing the key to be retried.
    async fn remove(&self, key: &str) -> Result<bool>;
}

/// Redis-backed idempotency store.
///
/// Records are serialized as JSON values; the acquire primitive is `SET NX`
/// with a TTL, so expiry is enforced by Redis itself.
pub struct RedisIdempotencyStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisIdempotencyStore {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)
    }

    fn ttl_of(record: &IdempotencyRecord) -> usize {
        let remaining = (record.expires_at - Utc::now()).num_seconds();
        remaining.max(1) as usize
    }
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn try_acquire(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<Option<IdempotencyRecord>> {
        let mut conn = self.connection().await?;
        let redis_key = self.make_key(&record.key);
        let payload = serde_json::to_string(record).map_err(AppError::Serialization)?;

        let set: Option<String> = conn
            .set_options(
                &redis_key,
                payload.as_str(),
                redis::SetOptions::default()
                    .conditional_set(redis::ExistenceCheck::NX)
                    .with_expiration(redis::SetExpiry::EX(Self::ttl_of(record))),
            )
            .await
            .map_err(AppError::Redis)?;

        if set.is_some() {
            return Ok(None);
        }

        let raw: Option<String> = conn.get(&redis_key).await.map_err(AppError::Redis)?;
        match raw {
            Some(s) => {
                let existing: IdempotencyRecord =
                    serde_json::from_str(&s).map_err(AppError::Serialization)?;
                Ok(Some(existing))
            }
            None => {
                // The competing record expired between SET NX and GET; claim
                // the key unconditionally.
                let _: () = conn
                    .set_ex(&redis_key, payload.as_str(), Self::ttl_of(record) as u64)
                    .await
                    .map_err(AppError::Redis)?;
                Ok(None)
            }
        }
    }

    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let mut conn = self.connection().await?;
        let redis_key = self.make_key(key);

        let raw: Option<String> = conn.get(&redis_key).await.map_err(AppError::Redis)?;
        match raw {
            Some(s) => {
                let record: IdempotencyRecord =
                    serde_json::from_str(&s).map_err(AppError::Serialization)?;
                if record.is_expired() {
                    Ok(None)
                } else {
                    Ok(Some(record))
                }
            }
            None => Ok(None),
        }
    }

    async fn complete(
        &self,
        key: &str,
        result: serde_json::Value,
    ) -> Result<Option<IdempotencyRecord>> {
        let mut conn = self.connection().await?;
        let redis_key = self.make_key(key);

        let raw: Option<String> = conn.get(&redis_key).await.map_err(AppError::Redis)?;
        let Some(s) = raw else {
            return Ok(None);
        };

        let mut record: IdempotencyRecord =
            serde_json::from_str(&s).map_err(AppError::Serialization)?;
        record.status = IdempotencyStatus::Completed;
        record.result = Some(result);
        record.completed_at = Some(Utc::now());

        let payload = serde_json::to_string(&record).map_err(AppError::Serialization)?;
        let _: Option<String> = conn
            .set_options(
                &redis_key,
                payload.as_str(),
                redis::SetOptions::default()
                    .with_expiration(redis::SetExpiry::KEEPTTL),
            )
            .await
            .map_err(AppError::Redis)?;

        Ok(Some(record))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let redis_key = self.make_key(key);

        let deleted: i64 = conn.del(&redis_key).await.map_err(AppError::Redis)?;
        Ok(deleted > 0)
    }
}

/// In-memory idempotency store.
///
/// Used in tests and for running the service without Redis. Coordination
/// holds only within a single process.
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyStore {
    records: Mutex<HashMap<String, IdempotencyRecord>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("poisoned idempotency store").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn try_acquire(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<Option<IdempotencyRecord>> {
        let mut records = self.records.lock().expect("poisoned idempotency store");
        match records.get(&record.key) {
            Some(existing) if !existing.is_expired() => Ok(Some(existing.clone())),
            _ => {
                records.insert(record.key.clone(), record.clone());
                Ok(None)
            }
        }
    }

    async fn find(&self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let records = self.records.lock().expect("poisoned idempotency store");
        match records.get(key) {
            Some(record) if !record.is_expired() => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    async fn complete(
        &self,
        key: &str,
        result: serde_json::Value,
    ) -> Result<Option<IdempotencyRecord>> {
        let mut records = self.records.lock().expect("poisoned idempotency store");
        match records.get_mut(key) {
            Some(record) => {
                record.status = IdempotencyStatus::Completed;
                record.result = Some(result);
                record.completed_at = Some(Utc::now());
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut records = self.records.lock().expect("poisoned idempotency store");
        Ok(records.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_expiry() {
        let live = IdempotencyRecord::new("k".to_string(), "op".to_string(), 60);
        assert!(!live.is_expired());

        let stale = IdempotencyRecord::new("k".to_string(), "op".to_string(), -1);
        assert!(stale.is_expired());
    }

    #[test]
    fn test_record_starts_in_progress() {
        let record = IdempotencyRecord::new("k".to_string(), "op".to_string(), 60);
        assert_eq!(record.status, IdempotencyStatus::InProgress);
        assert!(record.result.is_none());
        assert!(!record.is_completed());
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&IdempotencyStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let json = serde_json::to_string(&IdempotencyStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
    }

    #[test]
    fn test_find_on_empty_store() {
        let store = InMemoryIdempotencyStore::new();
        let found = tokio_test::block_on(store.find("missing")).unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_in_memory_acquire_and_duplicate() {
        let store = InMemoryIdempotencyStore::new();
        let record = IdempotencyRecord::new("key-1".to_string(), "op".to_string(), 60);

        let first = store.try_acquire(&record).await.unwrap();
        assert!(first.is_none());

        let again = IdempotencyRecord::new("key-1".to_string(), "op".to_string(), 60);
        let second = store.try_acquire(&again).await.unwrap();
        assert!(second.is_some());
        assert_eq!(second.unwrap().id, record.id);
    }

    #[tokio::test]
    async fn test_in_memory_expired_record_treated_as_absent() {
        let store = InMemoryIdempotencyStore::new();
        let stale = IdempotencyRecord::new("key-1".to_string(), "op".to_string(), -1);
        store.try_acquire(&stale).await.unwrap();

        assert!(store.find("key-1").await.unwrap().is_none());

        let fresh = IdempotencyRecord::new("key-1".to_string(), "op".to_string(), 60);
        let acquired = store.try_acquire(&fresh).await.unwrap();
        assert!(acquired.is_none(), "expired record must not block acquire");
    }

    #[tokio::test]
    async fn test_in_memory_complete_and_remove() {
        let store = InMemoryIdempotencyStore::new();
        let record = IdempotencyRecord::new("key-1".to_string(), "op".to_string(), 60);
        store.try_acquire(&record).await.unwrap();

        let completed = store
            .complete("key-1", serde_json::json!({"message": "done"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.status, IdempotencyStatus::Completed);
        assert!(completed.completed_at.is_some());

        assert!(store.remove("key-1").await.unwrap());
        assert!(!store.remove("key-1").await.unwrap());
        assert!(store.find("key-1").await.unwrap().is_none());
    }
}
