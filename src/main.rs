use std::sync::Arc;

use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use callgate::api::{create_router, AppState};
use callgate::config::Settings;
use callgate::flags::{FeatureFlags, HttpFlagStore};
use callgate::idempotency::{GateConfig, IdempotencyGate, RedisIdempotencyStore};
use callgate::observability::{init_logging, init_metrics, LogConfig, LogFormat};
use callgate::params::HttpParameterStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;

    // Initialize logging
    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(settings.application.log_format.as_str()),
        ..LogConfig::default()
    });
    info!("Configuration loaded");

    // Install metrics recorder
    let metrics_handle = init_metrics()?;

    // Connect to Redis
    info!("Connecting to Redis at {}...", settings.redis.url);
    let redis_client = redis::Client::open(settings.redis.url.clone())?;
    let mut con = redis_client.get_multiplexed_async_connection().await?;
    let _: () = redis::cmd("PING").query_async(&mut con).await?;
    info!("Redis connection established");

    // Shared clients, constructed once per process
    let parameters = Arc::new(HttpParameterStore::new(
        settings.parameter_store.base_url.clone(),
    ));
    let flag_store = HttpFlagStore::new(
        settings.feature_flags.base_url.clone(),
        settings.feature_flags.environment.clone(),
        settings.feature_flags.application.clone(),
        settings.feature_flags.name.clone(),
    );
    let feature_flags = FeatureFlags::new(Arc::new(flag_store));

    let store = RedisIdempotencyStore::new(
        redis_client.clone(),
        settings.idempotency.key_prefix.clone(),
    );
    let gate = Arc::new(IdempotencyGate::new(
        Arc::new(store),
        GateConfig {
            ttl_seconds: settings.idempotency.ttl_seconds,
            key_prefix: settings.idempotency.key_prefix.clone(),
            conflict_policy: settings.idempotency.conflict_policy,
            poll_interval_ms: settings.idempotency.poll_interval_ms,
            max_wait_ms: settings.idempotency.max_wait_ms,
        },
    ));

    let state = AppState::new(
        redis_client,
        parameters,
        feature_flags,
        gate,
        settings.parameter_store.parameter_name.clone(),
    )
    .with_metrics(metrics_handle);

    let app = create_router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = format!(
        "{}:{}",
        settings.application.host, settings.application.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
