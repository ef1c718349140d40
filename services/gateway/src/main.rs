//! Gateway - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use gateway::{AppState, Config, router};
use rust_common::{
    InMemoryStore, KeyValueStore, RedisStore, TracingConfig, init_tracing, run_until_drained,
    wait_for_signal,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&TracingConfig::from_env("gateway"));

    let config = Config::from_env().context("invalid gateway configuration")?;

    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisStore::connect(url)
                .await
                .context("failed to connect to revocation store")?,
        ),
        None => {
            warn!("REDIS_URL not set: revocations are local to this instance");
            Arc::new(InMemoryStore::default())
        }
    };

    if config.routes.is_empty() {
        warn!("No ROUTES configured: every non-public request will get 404");
    }

    let state = AppState::new(&config, store).context("failed to build upstream client")?;
    // Upstream timeout plus headroom for authentication and body buffering.
    let app = router(state, config.upstream_timeout + config.revocation_timeout * 2);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(addr = %config.bind_addr(), routes = config.routes.len(), "Gateway listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(wait_for_signal());
    run_until_drained(server.into_future(), config.shutdown_timeout).await;

    info!("Gateway stopped");
    Ok(())
}
