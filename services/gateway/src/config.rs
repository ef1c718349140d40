//! Gateway configuration with validation.
//!
//! Values come from the environment (and `.env` via dotenvy). Parsing goes
//! through a lookup function so tests can supply a map instead of mutating
//! the process environment.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use edge_trust::PublicPaths;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::proxy::Route;

/// Paths reachable without a bearer token unless `PUBLIC_PATHS` says otherwise.
pub const DEFAULT_PUBLIC_PATHS: &str =
    "/api/auth/login,/api/auth/signup,/api/auth/refresh,/health";

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Offending key
        field: String,
        /// Parser message
        reason: String,
    },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Offending key
        name: String,
        /// Parser message
        reason: String,
    },

    /// A `ROUTES` entry is not `/prefix=url`
    #[error("Invalid route entry '{entry}': expected /prefix=http://upstream")]
    InvalidRoute {
        /// The entry as written
        entry: String,
    },

    /// JWT and HMAC secrets must be distinct
    #[error("JWT_SECRET and HMAC_SECRET must differ")]
    SharedSecret,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Secret for end-user tokens
    pub jwt_secret: SecretString,
    /// Secret for the edge → service hop
    pub hmac_secret: SecretString,
    /// Sign forwarded requests
    pub hmac_enabled: bool,
    /// Paths that skip authentication
    pub public_paths: PublicPaths,
    /// Upstream routing table
    pub routes: Vec<Route>,
    /// Shared revocation store; in-process store when unset
    pub redis_url: Option<String>,
    /// Bound on one revocation lookup
    pub revocation_timeout: Duration,
    /// Bound on one upstream call
    pub upstream_timeout: Duration,
    /// Body buffering cap
    pub max_body_bytes: usize,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from a fixed map.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 8080)?,
            jwt_secret: required_secret(&lookup, "JWT_SECRET")?,
            hmac_secret: required_secret(&lookup, "HMAC_SECRET")?,
            hmac_enabled: parse_var(&lookup, "HMAC_ENABLED", true)?,
            public_paths: PublicPaths::parse(
                &lookup("PUBLIC_PATHS").unwrap_or_else(|| DEFAULT_PUBLIC_PATHS.to_string()),
            ),
            routes: parse_routes(&lookup("ROUTES").unwrap_or_default())?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            revocation_timeout: Duration::from_millis(parse_var(
                &lookup,
                "REVOCATION_TIMEOUT_MS",
                250,
            )?),
            upstream_timeout: Duration::from_secs(parse_var(&lookup, "UPSTREAM_TIMEOUT_SECS", 30)?),
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            shutdown_timeout: Duration::from_secs(parse_var(&lookup, "SHUTDOWN_TIMEOUT", 30)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.jwt_secret.expose_secret() == self.hmac_secret.expose_secret() {
            return Err(ConfigError::SharedSecret);
        }
        if let Some(url) = &self.redis_url {
            Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                field: "REDIS_URL".to_string(),
                reason: e.to_string(),
            })?;
        }
        for (name, value) in [
            ("REVOCATION_TIMEOUT_MS", self.revocation_timeout),
            ("UPSTREAM_TIMEOUT_SECS", self.upstream_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ParseError {
                    name: name.to_string(),
                    reason: "timeout must be greater than 0".to_string(),
                });
            }
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ParseError {
                name: "MAX_BODY_BYTES".to_string(),
                reason: "limit must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
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

/// Parse `ROUTES`: comma-separated `/prefix=http://upstream` entries.
///
/// # Errors
///
/// `InvalidRoute` for an entry without `=` or a prefix not starting with `/`,
/// `InvalidUrl` for an unparseable upstream.
pub fn parse_routes(list: &str) -> Result<Vec<Route>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, upstream) = entry
                .split_once('=')
                .filter(|(prefix, _)| prefix.starts_with('/'))
                .ok_or_else(|| ConfigError::InvalidRoute {
                    entry: entry.to_string(),
                })?;
            let upstream = Url::parse(upstream.trim()).map_err(|e| ConfigError::InvalidUrl {
                field: format!("ROUTES[{}]", prefix.trim()),
                reason: e.to_string(),
            })?;
            Ok(Route::new(prefix.trim(), upstream))
        })
        .collect()
}
