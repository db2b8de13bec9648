//! Trait definitions for dependency injection

use crate::core::{Info, RudderResult};
use crate::deploy::{Release, ReleaseRequest};
use crate::repository::Repository;
use async_trait::async_trait;
use std::sync::Arc;

/// Raw store snapshot as seen by the watch loop
///
/// `token` is opaque: equal tokens mean the data has not changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSnapshot {
    pub token: Option<String>,
    pub data: Vec<u8>,
}

/// Durable store of repository connection records
///
/// Implementations should be thread-safe (Send + Sync). Writes are
/// optimistic: a write racing another writer fails with a version conflict
/// and the caller re-reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InfoStore: Send + Sync {
    /// Persist a new record; fails AlreadyExists if the name is taken
    async fn create(&self, info: &Info) -> RudderResult<()>;

    /// Fails NotFound if absent
    async fn get(&self, name: &str) -> RudderResult<Info>;

    /// Remove a record and return it; fails NotFound if absent
    async fn delete(&self, name: &str) -> RudderResult<Info>;

    async fn list(&self) -> RudderResult<Vec<Info>>;

    /// Replace an existing record, bumping its version
    async fn update(&self, info: &Info) -> RudderResult<()>;

    /// Read the raw record document together with its version token
    async fn fetch_raw(&self) -> RudderResult<RawSnapshot>;
}

/// Key/value state with etag concurrency, the backing of [`InfoStore`]
#[async_trait]
pub trait StateBackend: Send + Sync {
    async fn get(&self, key: &str) -> RudderResult<Option<StateItem>>;

    /// Write `value`, returning the new etag.
    ///
    /// `etag == None` requires the key to be absent; otherwise the stored
    /// etag must match.
    async fn save(&self, key: &str, value: Vec<u8>, etag: Option<String>) -> RudderResult<String>;

    async fn delete(&self, key: &str, etag: Option<String>) -> RudderResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateItem {
    pub etag: String,
    pub value: Vec<u8>,
}

/// Fetches catalog documents and chart archives
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> RudderResult<Vec<u8>>;
}

/// Where charts get deployed
///
/// The post renderer carried by a [`ReleaseRequest`] runs over the rendered
/// manifests before the release is recorded.
#[async_trait]
pub trait DeploymentTarget: Send + Sync {
    async fn install(&self, request: ReleaseRequest) -> RudderResult<Release>;

    /// Remove a release by name (the instance id)
    async fn uninstall(&self, name: &str) -> RudderResult<Release>;

    /// Every currently deployed release
    async fn list(&self) -> RudderResult<Vec<Release>>;
}

/// Builds a [`Repository`] from its connection record
#[async_trait]
pub trait RepositoryConstructor: Send + Sync {
    async fn construct(&self, info: &Info) -> RudderResult<Arc<Repository>>;
}
