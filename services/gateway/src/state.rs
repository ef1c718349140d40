//! Application wiring.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use edge_trust::{RequestSigner, RevocationStore, TokenValidator};
use http::Request;
use rust_common::KeyValueStore;
use tracing::warn;

use crate::config::Config;
use crate::middleware::{DerivedIdentityLayer, EdgeAuthLayer, EdgeAuthenticator, TracingLayer};
use crate::proxy::{Proxy, RouteTable};

/// Shared per-process state.
#[derive(Clone)]
pub struct AppState {
    /// JWT gatekeeper
    pub authenticator: Arc<EdgeAuthenticator>,
    /// Shared validator, also used by the derived-identity filter
    pub validator: Arc<TokenValidator>,
    /// Upstream forwarder
    pub proxy: Arc<Proxy>,
}

impl AppState {
    /// Build state from configuration and a revocation backend.
    ///
    /// # Errors
    ///
    /// When the upstream HTTP client cannot be built.
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self, reqwest::Error> {
        let validator = Arc::new(TokenValidator::new(&config.jwt_secret));
        let revocations = RevocationStore::new(store).with_timeout(config.revocation_timeout);

        let signer = if config.hmac_enabled {
            RequestSigner::new(&config.hmac_secret)
        } else {
            warn!("HMAC signing disabled: upstream services receive unsigned requests");
            RequestSigner::disabled()
        };

        let proxy = Proxy::new(
            RouteTable::new(config.routes.clone()),
            signer,
            config.upstream_timeout,
            config.max_body_bytes,
        )?;

        Ok(Self {
            authenticator: Arc::new(EdgeAuthenticator::new(
                Arc::clone(&validator),
                revocations,
                config.public_paths.clone(),
            )),
            validator,
            proxy: Arc::new(proxy),
        })
    }
}

/// Gateway router: tracing → edge auth → derived identity → proxy.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(forward)
        .layer(DerivedIdentityLayer::new(Arc::clone(&state.validator)))
        .layer(EdgeAuthLayer::new(Arc::clone(&state.authenticator)))
        .layer(tower_http::timeout::TimeoutLayer::new(request_timeout))
        .layer(TracingLayer::new("gateway"))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn forward(State(state): State<AppState>, req: Request<Body>) -> Response {
    match state.proxy.forward(req).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
