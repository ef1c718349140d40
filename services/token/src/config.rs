//! Centralized configuration for the token service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use edge_trust::{PublicPaths, ReplayPolicy, VerifierConfig};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing required variable
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Variable present but unparseable or out of range
    #[error("Invalid {name}: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// JWT and HMAC secrets must be distinct
    #[error("JWT_SECRET and HMAC_SECRET must differ")]
    SharedSecret,
}

/// Token service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    // JWT settings
    /// Secret for platform tokens
    pub jwt_secret: SecretString,
    /// `iss` stamped on issued tokens and required on presented ones
    pub jwt_issuer: Option<String>,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,

    // Request verification
    /// Secret for the edge → service hop
    pub hmac_secret: SecretString,
    /// Verify inbound signatures
    pub hmac_enabled: bool,
    /// Accepted signer clock distance
    pub replay_window: Duration,
    /// Remember nonces for the window
    pub nonce_tracking: bool,
    /// Paths served without a signature
    pub public_paths: PublicPaths,
    /// Body buffering cap
    pub max_body_bytes: usize,

    // Storage
    /// Shared revocation store; in-process store when unset
    pub redis_url: Option<String>,
    /// Bound on one store call, for both the revocation list and the
    /// nonce cache
    pub revocation_timeout: Duration,

    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from a fixed map.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 8081)?,
            jwt_secret: required_secret(&lookup, "JWT_SECRET")?,
            jwt_issuer: lookup("JWT_ISSUER").filter(|v| !v.trim().is_empty()),
            access_token_ttl: Duration::from_secs(parse_var(&lookup, "ACCESS_TOKEN_TTL", 900)?),
            refresh_token_ttl: Duration::from_secs(parse_var(
                &lookup,
                "REFRESH_TOKEN_TTL",
                604_800,
            )?),
            hmac_secret: required_secret(&lookup, "HMAC_SECRET")?,
            hmac_enabled: parse_var(&lookup, "HMAC_ENABLED", true)?,
            replay_window: Duration::from_secs(parse_var(&lookup, "HMAC_REPLAY_WINDOW_SECS", 300)?),
            nonce_tracking: parse_var(&lookup, "HMAC_NONCE_TRACKING", true)?,
            public_paths: PublicPaths::parse(
                &lookup("PUBLIC_PATHS").unwrap_or_else(|| "/health".to_string()),
            ),
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            revocation_timeout: Duration::from_millis(parse_var(
                &lookup,
                "REVOCATION_TIMEOUT_MS",
                250,
            )?),
            shutdown_timeout: Duration::from_secs(parse_var(&lookup, "SHUTDOWN_TIMEOUT", 30)?),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid("PORT", "must be between 1 and 65535"));
        }
        if self.jwt_secret.expose_secret() == self.hmac_secret.expose_secret() {
            return Err(ConfigError::SharedSecret);
        }
        if self.access_token_ttl.is_zero() {
            return Err(invalid("ACCESS_TOKEN_TTL", "must be greater than 0"));
        }
        if self.refresh_token_ttl <= self.access_token_ttl {
            return Err(invalid(
                "REFRESH_TOKEN_TTL",
                "must be longer than ACCESS_TOKEN_TTL",
            ));
        }
        if self.replay_window.is_zero() {
            return Err(invalid("HMAC_REPLAY_WINDOW_SECS", "must be greater than 0"));
        }
        if self.revocation_timeout.is_zero() {
            return Err(invalid("REVOCATION_TIMEOUT_MS", "must be greater than 0"));
        }
        if let Some(url) = &self.redis_url {
            Url::parse(url).map_err(|e| invalid("REDIS_URL", &e.to_string()))?;
        }
        Ok(())
    }

    /// Internal verifier settings.
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig::new(self.hmac_secret.clone())
            .with_enabled(self.hmac_enabled)
            .with_window(self.replay_window)
            .with_replay(ReplayPolicy::from_tracking_flag(self.nonce_tracking))
            .with_public_paths(self.public_paths.clone())
            .with_max_body_bytes(self.max_body_bytes)
            .with_store_timeout(self.revocation_timeout)
    }

    /// `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a variable with a default value.
fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &e.to_string())),
        None => Ok(default),
    }
}

fn required_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<SecretString, ConfigError> {
    lookup(name)
        .filter(|v| !v.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingRequired(name.to_string()))
}
