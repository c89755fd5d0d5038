use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Configuration for idempotency key generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyGeneratorConfig {
    /// Prefix for generated keys.
    pub key_prefix: String,
}

impl Default for KeyGeneratorConfig {
    fn default() -> Self {
        Self {
            key_prefix: "idem".to_string(),
        }
    }
}

/// Generator for idempotency keys using SHA-256 hashing.
///
/// Keys are derived from the logical operation name and the caller-supplied
/// identifying value, so logically-equivalent repeat invocations always map
/// to the same key.
#[derive(Debug, Clone)]
pub struct IdempotencyKeyGenerator {
    config: KeyGeneratorConfig,
}

impl IdempotencyKeyGenerator {
    pub fn new(config: KeyGeneratorConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(KeyGeneratorConfig::default())
    }

    /// Derives a key from an operation name and the caller-supplied value.
    pub fn generate(&self, operation: &str, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(b"|");
        hasher.update(value.as_bytes());

        let hash_hex = hex::encode(hasher.finalize());
        format!("{}_{}", self.config.key_prefix, hash_hex)
    }

    /// Normalizes a client-provided idempotency key into the internal format.
    pub fn from_client_key(&self, client_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(client_key.as_bytes());
        let hash_hex = hex::encode(hasher.finalize());
        format!("{}_{}", self.config.key_prefix, hash_hex)
    }
}
