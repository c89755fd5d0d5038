use serde::Deserialize;

use crate::idempotency::ConflictPolicy;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub parameter_store: ParameterStoreSettings,
    pub feature_flags: FeatureFlagSettings,
    pub idempotency: IdempotencySettings,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ParameterStoreSettings {
    pub base_url: String,
    /// Name of the parameter served by GET /get_parameters/.
    pub parameter_name: String,
}

#[derive(Debug, Deserialize)]
pub struct FeatureFlagSettings {
    pub base_url: String,
    pub environment: String,
    pub application: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencySettings {
    pub key_prefix: String,
    pub ttl_seconds: i64,
    pub conflict_policy: ConflictPolicy,
    pub poll_interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
