//! Token service for edu-platform.
//!
//! Refreshes access tokens and revokes tokens on logout. Runs behind the
//! gateway: every request must carry a valid hop signature.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::TokenServiceError;
pub use state::{AppState, router};
