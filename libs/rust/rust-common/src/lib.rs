//! Shared library for cross-cutting concerns in edu-platform Rust services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - A TTL key/value store abstraction (in-process and Redis backends)
//! - Tracing subscriber initialisation
//! - Signal handling for graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod kv;
pub mod shutdown;
pub mod tracing_config;

pub use error::PlatformError;
pub use kv::{InMemoryStore, KeyValueStore, RedisStore};
pub use shutdown::{run_until_drained, wait_for_signal};
pub use tracing_config::{TracingConfig, init_tracing};
