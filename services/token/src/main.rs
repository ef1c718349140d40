//! Token Service - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use rust_common::{
    InMemoryStore, KeyValueStore, RedisStore, TracingConfig, init_tracing, run_until_drained,
    wait_for_signal,
};
use token_service::{AppState, Config, router};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&TracingConfig::from_env("token-service"));

    let config = Config::from_env().context("invalid token service configuration")?;

    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisStore::connect(url)
                .await
                .context("failed to connect to revocation store")?,
        ),
        None => {
            warn!("REDIS_URL not set: revocations and nonces are local to this instance");
            Arc::new(InMemoryStore::default())
        }
    };

    let app = router(AppState::new(&config, store));

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(
        addr = %config.bind_addr(),
        hmac_enabled = config.hmac_enabled,
        nonce_tracking = config.nonce_tracking,
        "Token service listening"
    );

    let server = axum::serve(listener, app).with_graceful_shutdown(wait_for_signal());
    run_until_drained(server.into_future(), config.shutdown_timeout).await;

    info!("Token service stopped");
    Ok(())
}
