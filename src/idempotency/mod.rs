pub mod gate;
pub mod key_generator;
pub mod storage;

pub use gate::{
    ConflictPolicy, GateConfig, IdempotencyGate, IdempotencyMetrics, MetricsSnapshot,
};
pub use key_generator::{IdempotencyKeyGenerator, KeyGeneratorConfig};
pub use storage::{
    IdempotencyRecord, IdempotencyStatus, IdempotencyStore, InMemoryIdempotencyStore,
    RedisIdempotencyStore,
};
