//! Key/value store doubles.

use std::time::Duration;

use async_trait::async_trait;
use rust_common::{KeyValueStore, PlatformError};

/// Store whose every call fails as if the backend were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn put_with_ttl(&self, _key: &str, _ttl: Duration) -> Result<(), PlatformError> {
        Err(PlatformError::unavailable("store offline"))
    }

    async fn put_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, PlatformError> {
        Err(PlatformError::unavailable("store offline"))
    }

    async fn exists(&self, _key: &str) -> Result<bool, PlatformError> {
        Err(PlatformError::unavailable("store offline"))
    }
}

/// Store that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledStore;

#[async_trait]
impl KeyValueStore for StalledStore {
    async fn put_with_ttl(&self, _key: &str, _ttl: Duration) -> Result<(), PlatformError> {
        std::future::pending().await
    }

    async fn put_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, PlatformError> {
        std::future::pending().await
    }

    async fn exists(&self, _key: &str) -> Result<bool, PlatformError> {
        std::future::pending().await
    }
}
