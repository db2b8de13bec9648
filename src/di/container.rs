//! Service container for dependency injection

use super::traits::{ArtifactFetcher, DeploymentTarget, InfoStore, RepositoryConstructor};
use crate::catalog::HttpFetcher;
use crate::config::Config;
use crate::core::RudderResult;
use crate::deploy::{Driver, FilesystemTarget, MemoryTarget};
use crate::hub::Hub;
use crate::installer::ComponentSource;
use crate::repository::{CatalogConstructor, RepositoryContext};
use crate::store::{FileState, MemoryState, StateInfoStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Service container for dependency injection
///
/// Wires the store, fetcher, deployment target, and repository constructor
/// into one [`Hub`]. Every service is held as `Arc<dyn Trait>` so tests can
/// swap implementations.
#[derive(Clone)]
pub struct ServiceContainer {
    pub config: Config,
    pub store: Arc<dyn InfoStore>,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub target: Arc<dyn DeploymentTarget>,
    pub constructor: Arc<dyn RepositoryConstructor>,
    hub: Arc<Hub>,
}

impl ServiceContainer {
    /// Create a service container with production implementations
    ///
    /// - Records are kept in the configured state directory
    /// - Catalogs and charts are fetched over HTTP with the configured timeout
    /// - Releases go to the configured driver
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be resolved or created, or the
    /// HTTP client cannot be built.
    pub fn new(config: Config) -> RudderResult<Self> {
        let store: Arc<dyn InfoStore> =
            Arc::new(StateInfoStore::new(FileState::new(config.state_dir()?)?));
        let fetcher: Arc<dyn ArtifactFetcher> =
            Arc::new(HttpFetcher::new(config.request_timeout())?);
        let target: Arc<dyn DeploymentTarget> = match config.driver {
            Driver::Memory => Arc::new(MemoryTarget::new(config.namespace.as_str())),
            Driver::Filesystem => Arc::new(FilesystemTarget::new(
                config.deploy_dir()?,
                config.namespace.as_str(),
            )?),
        };
        let cache_root = config.cache_dir()?;
        debug!("Using {} driver, cache {}", config.driver, cache_root.display());
        Ok(Self::with_providers(config, cache_root, store, fetcher, target))
    }

    /// A container that keeps everything in memory and fetches through
    /// `fetcher`
    pub fn in_memory(fetcher: Arc<dyn ArtifactFetcher>, cache_root: PathBuf) -> Self {
        let config = Config {
            driver: Driver::Memory,
            ..Config::default()
        };
        let store: Arc<dyn InfoStore> = Arc::new(StateInfoStore::new(MemoryState::new()));
        let target: Arc<dyn DeploymentTarget> =
            Arc::new(MemoryTarget::new(config.namespace.as_str()));
        Self::with_providers(config, cache_root, store, fetcher, target)
    }

    /// Create a service container with custom provider implementations
    pub fn with_providers(
        config: Config,
        cache_root: PathBuf,
        store: Arc<dyn InfoStore>,
        fetcher: Arc<dyn ArtifactFetcher>,
        target: Arc<dyn DeploymentTarget>,
    ) -> Self {
        let component = Arc::new(ComponentSource::new(
            config.component.repo_url.as_str(),
            config.component.chart_name.as_str(),
            config.component.secret.as_str(),
            fetcher.clone(),
        ));
        let constructor: Arc<dyn RepositoryConstructor> =
            Arc::new(CatalogConstructor::new(RepositoryContext {
                namespace: config.namespace.clone(),
                cache_root,
                fetcher: fetcher.clone(),
                target: target.clone(),
                component,
            }));
        let hub = Arc::new(Hub::new(constructor.clone(), target.clone(), store.clone()));

        Self {
            config,
            store,
            fetcher,
            target,
            constructor,
            hub,
        }
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
