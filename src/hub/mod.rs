//! The repository hub.
//!
//! [`Hub`] keeps one [`Repository`] per connection record and keeps that set
//! in step with the durable store: direct calls (add, delete, update) write
//! through the store, and a background task started by [`Hub::init`] applies
//! changes made by anyone else.

pub mod rollback;

use crate::core::{Info, InstallerBrief, ResultExt, RudderError, RudderResult};
use crate::deploy::Release;
use crate::di::{DeploymentTarget, InfoStore, RepositoryConstructor};
use crate::repository::Repository;
use crate::store::{watch, Changes, Snapshot};
use rollback::{Compensation, CompensationStack};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch as signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Published repositories by name
#[derive(Debug, Default)]
pub struct RepositorySet {
    inner: RwLock<HashMap<String, Arc<Repository>>>,
}

impl RepositorySet {
    pub fn get(&self, name: &str) -> Option<Arc<Repository>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Publish `repo`, returning the entry it replaced
    pub fn insert(&self, repo: Arc<Repository>) -> Option<Arc<Repository>> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(repo.name().to_string(), repo)
    }

    /// Publish `repo` unless its name is taken; true if published
    pub fn insert_if_absent(&self, repo: Arc<Repository>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.contains_key(repo.name()) {
            return false;
        }
        inner.insert(repo.name().to_string(), repo);
        true
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Repository>> {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every published repository, sorted by name
    pub fn snapshot(&self) -> Vec<Arc<Repository>> {
        let mut repos: Vec<_> = self
            .inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        repos.sort_by(|a, b| a.name().cmp(b.name()));
        repos
    }
}

/// Handle on the background reconciliation task
pub struct WatchHandle {
    shutdown: signal::Sender<bool>,
    task: JoinHandle<RudderResult<()>>,
    startup: Option<RudderError>,
}

impl WatchHandle {
    /// Records that failed to open when the hub started, aggregated
    pub fn startup_errors(&self) -> Option<&RudderError> {
        self.startup.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to end on its own (it only does so on a fatal
    /// error). Do not call [`shutdown`](Self::shutdown) after this returns.
    pub async fn wait(&mut self) -> RudderResult<()> {
        (&mut self.task)
            .await
            .map_err(|e| RudderError::Internal(format!("watch task failed: {}", e)))?
    }

    /// Stop the task and wait for it.
    pub async fn shutdown(self) -> RudderResult<()> {
        // the task may already be gone
        let _ = self.shutdown.send(true);
        self.task
            .await
            .map_err(|e| RudderError::Internal(format!("watch task failed: {}", e)))?
    }
}

pub struct Hub {
    repos: Arc<RepositorySet>,
    constructor: Arc<dyn RepositoryConstructor>,
    target: Arc<dyn DeploymentTarget>,
    store: Arc<dyn InfoStore>,
}

impl Hub {
    pub fn new(
        constructor: Arc<dyn RepositoryConstructor>,
        target: Arc<dyn DeploymentTarget>,
        store: Arc<dyn InfoStore>,
    ) -> Self {
        Self {
            repos: Arc::new(RepositorySet::default()),
            constructor,
            target,
            store,
        }
    }

    /// Load every stored record and start reconciling.
    ///
    /// Repositories that open are published and the task starts even when
    /// others fail; those failures are kept on the handle. Only a failed
    /// snapshot read is an error here.
    pub async fn init(self: &Arc<Self>, interval: Duration) -> RudderResult<WatchHandle> {
        let seed = Snapshot::read(self.store.as_ref())
            .await
            .context("read initial snapshot")?;
        let changes = Changes {
            news: seed.records.values().map(|r| r.info.clone()).collect(),
            ..Changes::default()
        };
        let startup = self.apply(changes).await.err();
        match &startup {
            Some(e) => warn!(
                "Hub initialized with {} repositories, some failed: {}",
                self.repos.len(),
                e
            ),
            None => info!("Hub initialized with {} repositories", self.repos.len()),
        }

        let (tx, rx) = signal::channel(false);
        let hub = Arc::clone(self);
        let task = tokio::spawn(async move {
            let store = hub.store.clone();
            let result = watch(store.as_ref(), interval, seed, rx, |changes| {
                let hub = hub.clone();
                async move { hub.apply(changes).await }
            })
            .await;
            if let Err(e) = &result {
                error!("Reconciliation stopped: {}", e);
            }
            result
        });

        Ok(WatchHandle {
            shutdown: tx,
            task,
            startup,
        })
    }

    /// Reconcile the published set with store changes.
    ///
    /// Every entry is attempted; the failures are returned together.
    pub async fn apply(&self, changes: Changes) -> RudderResult<()> {
        let mut errors = Vec::new();

        for info in changes.news {
            match self.constructor.construct(&info).await {
                Ok(repo) => {
                    self.repos.insert(repo);
                    info!("Added repository {}", info.name);
                }
                Err(e) => {
                    error!("Failed to add repository {}: {}", info.name, e);
                    errors.push(e.context(format!("add repository {}", info.name)));
                }
            }
        }

        for info in changes.deletes {
            if let Some(repo) = self.repos.remove(&info.name) {
                info!("Removed repository {}", info.name);
                if let Err(e) = repo.close() {
                    error!("Failed to close repository {}: {}", info.name, e);
                    errors.push(e.context(format!("close repository {}", info.name)));
                }
            }
        }

        for info in changes.updates {
            match self.constructor.construct(&info).await {
                Ok(repo) => {
                    self.repos.insert(repo);
                    info!("Updated repository {}", info.name);
                }
                Err(e) => {
                    error!("Failed to update repository {}: {}", info.name, e);
                    errors.push(e.context(format!("update repository {}", info.name)));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RudderError::Aggregate(errors))
        }
    }

    /// Open a new repository and persist its record.
    pub async fn add(&self, info: &Info) -> RudderResult<Arc<Repository>> {
        info.validate()?;
        let repo = self.constructor.construct(info).await?;
        self.store
            .create(info)
            .await
            .with_context(|| format!("store repository {}", info.name))?;
        self.repos.insert(repo.clone());
        info!("Added repository {}", info.name);
        Ok(repo)
    }

    /// Persist a changed record and publish the repository it describes.
    pub async fn update(&self, info: &Info) -> RudderResult<Arc<Repository>> {
        info.validate()?;
        let repo = self.constructor.construct(info).await?;
        self.store
            .update(info)
            .await
            .with_context(|| format!("store repository {}", info.name))?;
        self.repos.insert(repo.clone());
        info!("Updated repository {}", info.name);
        Ok(repo)
    }

    /// Unpublish a repository and delete its record.
    ///
    /// If the store rejects the delete the repository is published again.
    /// The caller owns the returned repository and should
    /// [`close`](Repository::close) it.
    pub async fn delete(&self, name: &str) -> RudderResult<Arc<Repository>> {
        let repo = self
            .repos
            .remove(name)
            .ok_or_else(|| RudderError::NotFound(format!("repository '{}'", name)))?;

        let mut undo = CompensationStack::new();
        undo.push(Compensation::Republish {
            repos: self.repos.clone(),
            repo: repo.clone(),
        });

        match self.store.delete(name).await {
            Ok(_) => {
                undo.commit();
                info!("Deleted repository {}", name);
                Ok(repo)
            }
            Err(e) => {
                undo.rollback();
                Err(e.context(format!("delete repository {}", name)))
            }
        }
    }

    /// A published repository, opening it from the store on a miss.
    pub async fn get(&self, name: &str) -> RudderResult<Arc<Repository>> {
        if let Some(repo) = self.repos.get(name) {
            return Ok(repo);
        }
        debug!("Repository {} not published, reading store", name);

        let info = match self.store.get(name).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                return Err(RudderError::NotFound(format!("repository '{}'", name)))
            }
            Err(e) => {
                return Err(RudderError::Internal(format!(
                    "read repository {}: {}",
                    name, e
                )))
            }
        };
        let repo = self.constructor.construct(&info).await.map_err(|e| {
            RudderError::Internal(format!("open repository {}: {}", name, e))
        })?;
        self.repos.insert(repo.clone());
        Ok(repo)
    }

    /// Published repositories, sorted by name
    pub fn list(&self) -> Vec<Arc<Repository>> {
        self.repos.snapshot()
    }

    /// Remove the instance `instance_id` of the package `brief` names.
    ///
    /// Goes through the owning repository when it still lists the package,
    /// otherwise straight to the deployment target.
    pub async fn uninstall(&self, instance_id: &str, brief: &InstallerBrief) -> RudderResult<Release> {
        if let Some(repo) = self.repos.get(&brief.repo) {
            let installed = repo.installed().await?;
            if let Some(mut installer) = installed
                .into_iter()
                .find(|i| i.brief().same_package(brief))
            {
                installer.set_id(instance_id);
                return installer.uninstall().await;
            }
            debug!("{} is not installed from {}", brief, brief.repo);
        }
        info!("Removing {} directly from the deployment target", instance_id);
        self.target
            .uninstall(instance_id)
            .await
            .with_context(|| format!("uninstall {}", instance_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::deploy::MemoryTarget;
    use crate::di::mocks::MockFetcher;
    use crate::di::traits::MockInfoStore;
    use crate::di::RawSnapshot;
    use crate::repository::testutil::{context, serve_catalog, REPO_URL};
    use crate::repository::CatalogConstructor;
    use crate::store::{MemoryState, StateInfoStore};
    use tempfile::TempDir;

    const OTHER_URL: &str = "https://other.example.com";
    const DOWN_URL: &str = "https://down.example.com";
    const TICK: Duration = Duration::from_millis(10);

    struct Fixture {
        hub: Arc<Hub>,
        store: Arc<dyn InfoStore>,
        target: Arc<MemoryTarget>,
        _temp: TempDir,
    }

    fn fixture_with_store(store: Arc<dyn InfoStore>) -> Fixture {
        let temp = TempDir::new().unwrap();
        let fetcher = MockFetcher::new();
        serve_catalog(&fetcher, REPO_URL);
        serve_catalog(&fetcher, OTHER_URL);
        let (ctx, target) = context(&fetcher, temp.path());
        let hub = Arc::new(Hub::new(
            Arc::new(CatalogConstructor::new(ctx)),
            target.clone(),
            store.clone(),
        ));
        Fixture {
            hub,
            store,
            target,
            _temp: temp,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(Arc::new(StateInfoStore::new(MemoryState::new())))
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let f = fixture();
        let info = Info::new("official", REPO_URL);
        f.hub.add(&info).await.unwrap();

        let repo = f.hub.get("official").await.unwrap();
        assert_eq!(repo.info(), &info);
        assert_eq!(f.store.get("official").await.unwrap(), info);
    }

    #[tokio::test]
    async fn test_add_fails_fast_and_rejects_duplicates() {
        let f = fixture();
        assert!(f.hub.add(&Info::new("down", DOWN_URL)).await.is_err());
        assert!(f.store.get("down").await.unwrap_err().is_not_found());

        f.hub.add(&Info::new("official", REPO_URL)).await.unwrap();
        let err = f
            .hub
            .add(&Info::new("official", REPO_URL))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_stable() {
        let f = fixture();
        f.hub.add(&Info::new("zeta", OTHER_URL)).await.unwrap();
        f.hub.add(&Info::new("alpha", REPO_URL)).await.unwrap();

        let names = |repos: Vec<Arc<Repository>>| {
            repos
                .iter()
                .map(|r| r.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(f.hub.list()), vec!["alpha", "zeta"]);
        assert_eq!(names(f.hub.list()), names(f.hub.list()));
    }

    #[tokio::test]
    async fn test_delete() {
        let f = fixture();
        f.hub.add(&Info::new("official", REPO_URL)).await.unwrap();

        let removed = f.hub.delete("official").await.unwrap();
        assert_eq!(removed.name(), "official");
        assert!(f.hub.list().is_empty());
        assert!(f.hub.get("official").await.unwrap_err().is_not_found());
        assert!(f.hub.delete("official").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_rolls_back_on_store_failure() {
        let info = Info::new("official", REPO_URL);
        let mut store = MockInfoStore::new();
        store.expect_create().returning(|_| Ok(()));
        store
            .expect_delete()
            .returning(|_| Err(RudderError::Transient("store unavailable".to_string())));
        store.expect_get().never();
        let f = fixture_with_store(Arc::new(store));

        let added = f.hub.add(&info).await.unwrap();
        let err = f.hub.delete("official").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientIo);

        let repo = f.hub.get("official").await.unwrap();
        assert!(Arc::ptr_eq(&repo, &added));
    }

    #[tokio::test]
    async fn test_get_miss_error_kinds() {
        let mut store = MockInfoStore::new();
        store.expect_get().returning(|name| match name {
            "gone" => Err(RudderError::NotFound(name.to_string())),
            "down" => Ok(Info::new("down", DOWN_URL)),
            _ => Err(RudderError::Transient("timeout".to_string())),
        });
        let f = fixture_with_store(Arc::new(store));

        assert!(f.hub.get("gone").await.unwrap_err().is_not_found());
        assert_eq!(
            f.hub.get("flaky").await.unwrap_err().kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            f.hub.get("down").await.unwrap_err().kind(),
            ErrorKind::Internal
        );
    }

    #[tokio::test]
    async fn test_get_reads_through_store() {
        let f = fixture();
        f.store
            .create(&Info::new("official", REPO_URL))
            .await
            .unwrap();
        assert!(f.hub.list().is_empty());

        f.hub.get("official").await.unwrap();
        assert_eq!(f.hub.list().len(), 1);
    }

    #[tokio::test]
    async fn test_init_aggregates_failures() {
        let f = fixture();
        f.store
            .create(&Info::new("official", REPO_URL))
            .await
            .unwrap();
        f.store.create(&Info::new("down", DOWN_URL)).await.unwrap();
        f.store.create(&Info::new("gone", DOWN_URL)).await.unwrap();

        let handle = f.hub.init(TICK).await.unwrap();
        match handle.startup_errors() {
            Some(RudderError::Aggregate(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected startup errors: {:?}", other),
        }
        let names: Vec<_> = f.hub.list().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["official"]);

        f.store.create(&Info::new("other", OTHER_URL)).await.unwrap();
        tokio::time::sleep(TICK * 20).await;
        assert!(!handle.is_finished());
        assert_eq!(f.hub.list().len(), 2);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_init_reconciles_store_changes() {
        let f = fixture();
        f.store
            .create(&Info::new("official", REPO_URL))
            .await
            .unwrap();
        let handle = f.hub.init(TICK).await.unwrap();
        assert_eq!(f.hub.list().len(), 1);

        f.store.create(&Info::new("other", OTHER_URL)).await.unwrap();
        f.store.delete("official").await.unwrap();
        tokio::time::sleep(TICK * 20).await;

        let names: Vec<_> = f.hub.list().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["other"]);

        f.store
            .update(&Info::new("other", REPO_URL))
            .await
            .unwrap();
        tokio::time::sleep(TICK * 20).await;
        assert_eq!(f.hub.get("other").await.unwrap().info().url, REPO_URL);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recreated_record_is_reconstructed() {
        let f = fixture();
        f.store
            .create(&Info::new("official", REPO_URL))
            .await
            .unwrap();
        f.store.create(&Info::new("keep", OTHER_URL)).await.unwrap();
        let handle = f.hub.init(Duration::from_millis(50)).await.unwrap();

        f.store.delete("official").await.unwrap();
        f.store
            .create(&Info::new("official", OTHER_URL))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let repo = f.hub.get("official").await.unwrap();
        assert_eq!(repo.info().url, OTHER_URL);
        assert_eq!(f.hub.list().len(), 2);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_failure_ends_task() {
        let mut store = MockInfoStore::new();
        let mut calls = 0;
        store.expect_fetch_raw().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(RawSnapshot::default())
            } else {
                Err(RudderError::Transient("connection reset".to_string()))
            }
        });
        let f = fixture_with_store(Arc::new(store));

        let mut handle = f.hub.init(TICK).await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let f = fixture();
        let handle = f.hub.init(Duration::from_secs(3600)).await.unwrap();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_uninstall_through_repository() {
        let f = fixture();
        let repo = f.hub.add(&Info::new("official", REPO_URL)).await.unwrap();
        let mut installer = repo.get("echo", Some("0.1.0")).await.unwrap();
        installer.set_id("echo-1");
        installer.install(&[]).await.unwrap();

        let brief = installer.brief().clone();
        let release = f.hub.uninstall("echo-1", &brief).await.unwrap();
        assert_eq!(release.name, "echo-1");
        assert!(f.target.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_uninstall_falls_back_to_target() {
        let f = fixture();
        let repo = f.hub.add(&Info::new("official", REPO_URL)).await.unwrap();
        let mut installer = repo.get("echo", None).await.unwrap();
        installer.set_id("echo-1");
        installer.install(&[]).await.unwrap();
        let brief = installer.brief().clone();

        f.hub.delete("official").await.unwrap();
        f.hub.uninstall("echo-1", &brief).await.unwrap();
        assert!(f.target.list().await.unwrap().is_empty());

        let err = f.hub.uninstall("echo-1", &brief).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
