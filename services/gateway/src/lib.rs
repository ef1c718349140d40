//! Edge gateway for edu-platform.
//!
//! Authenticates end users by bearer JWT, rejects revoked tokens, replaces
//! client-supplied identity headers with verified ones, and forwards each
//! request to its upstream with a fresh HMAC signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::GatewayError;
pub use state::{AppState, router};
