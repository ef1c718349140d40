//! Application wiring.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use edge_trust::{InternalVerifier, InternalVerifierLayer, RevocationStore, TokenIssuer, TokenValidator};
use rust_common::KeyValueStore;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::handlers;

/// Shared per-process state.
#[derive(Clone)]
pub struct AppState {
    /// Validates presented access and refresh tokens
    pub validator: Arc<TokenValidator>,
    /// Mints new access tokens
    pub issuer: Arc<TokenIssuer>,
    /// Revocation list shared with the gateway
    pub revocations: RevocationStore,
    /// Verifies the gateway's signature on every inbound hop
    pub verifier: Arc<InternalVerifier>,
}

impl AppState {
    /// Build state from configuration. `store` backs both the revocation
    /// list and the nonce cache.
    #[must_use]
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        let mut validator = TokenValidator::new(&config.jwt_secret);
        let mut issuer = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        if let Some(iss) = &config.jwt_issuer {
            validator = validator.with_issuer(iss.clone());
            issuer = issuer.with_issuer(iss.clone());
        }

        if !config.hmac_enabled {
            warn!("HMAC verification disabled: any caller reaching this service is trusted");
        }

        Self {
            validator: Arc::new(validator),
            issuer: Arc::new(issuer),
            revocations: RevocationStore::new(Arc::clone(&store))
                .with_timeout(config.revocation_timeout),
            verifier: Arc::new(InternalVerifier::new(config.verifier_config(), store)),
        }
    }
}

/// Token service router; every route runs behind the internal verifier.
pub fn router(state: AppState) -> Router {
    let verifier = Arc::clone(&state.verifier);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/refresh", post(handlers::refresh))
        .route("/api/auth/logout", post(handlers::logout))
        .layer(InternalVerifierLayer::new(verifier))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
