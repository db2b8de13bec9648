//! Plugin repositories.
//!
//! A [`Repository`] couples a connection record with the catalog it points
//! at, a local archive cache, and the deployment target its installers
//! deploy to.

pub mod cache;
pub mod constructor;

pub use cache::ChartCache;
pub use constructor::CatalogConstructor;

use crate::catalog::{fetch_first, Entry, Index};
use crate::chart::load_archive;
use crate::core::path::repo_cache_dir;
use crate::core::{Info, InstallerBrief, ResultExt, RudderError, RudderResult};
use crate::deploy::Release;
use crate::di::{ArtifactFetcher, DeploymentTarget};
use crate::installer::{ComponentSource, Installer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a repository needs besides its own record
#[derive(Clone)]
pub struct RepositoryContext {
    pub namespace: String,
    /// Parent of every repository's archive cache
    pub cache_root: PathBuf,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub target: Arc<dyn DeploymentTarget>,
    pub component: Arc<ComponentSource>,
}

pub struct Repository {
    info: Info,
    index: Index,
    cache: ChartCache,
    namespace: String,
    fetcher: Arc<dyn ArtifactFetcher>,
    target: Arc<dyn DeploymentTarget>,
    component: Arc<ComponentSource>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("info", &self.info)
            .field("packages", &self.index.len())
            .field("cache", &self.cache.dir())
            .finish()
    }
}

impl Repository {
    /// Validate `info`, fetch its catalog, and prepare its cache.
    pub async fn open(info: Info, ctx: &RepositoryContext) -> RudderResult<Self> {
        info.validate()?;
        let index = Index::load(&info.name, &info.url, ctx.fetcher.as_ref())
            .await
            .with_context(|| format!("open repository {}", info.name))?;
        let cache = ChartCache::new(repo_cache_dir(&ctx.cache_root, &info.name))?;
        info!("Opened repository {} ({} packages)", info.name, index.len());
        Ok(Self {
            info,
            index,
            cache,
            namespace: ctx.namespace.clone(),
            fetcher: ctx.fetcher.clone(),
            target: ctx.target.clone(),
            component: ctx.component.clone(),
        })
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Number of packages in the catalog
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Releases recorded under this repository
    async fn releases(&self) -> RudderResult<Vec<Release>> {
        let releases = self
            .target
            .list()
            .await
            .context("list deployed releases")?;
        Ok(releases
            .into_iter()
            .filter(|r| r.repo == self.info.name)
            .collect())
    }

    fn brief(&self, entry: &Entry, releases: &[Release]) -> InstallerBrief {
        let mut brief = entry.brief(&self.info.name);
        brief.installed = releases
            .iter()
            .any(|r| r.chart_name == entry.name && r.chart_version == entry.version);
        brief
    }

    /// Enabled catalog entries matching `word` (`"*"` for all).
    pub async fn search(&self, word: &str, version: Option<&str>) -> RudderResult<Vec<InstallerBrief>> {
        let entries = self.index.search(word, version);
        let releases = self.releases().await?;
        Ok(entries.iter().map(|e| self.brief(e, &releases)).collect())
    }

    /// An installer for one package version, the newest when `version` is
    /// not given.
    pub async fn get(&self, name: &str, version: Option<&str>) -> RudderResult<Installer> {
        let entry = self
            .index
            .search(name, version)
            .into_iter()
            .next()
            .ok_or_else(|| {
                RudderError::NotFound(format!(
                    "{}/{}@{}",
                    self.info.name,
                    name,
                    version.unwrap_or("latest")
                ))
            })?;

        let archive = self.archive(&entry).await?;
        let chart = load_archive(&archive)
            .with_context(|| format!("load chart {}-{}", entry.name, entry.version))?;
        let releases = self.releases().await?;
        let brief = self.brief(&entry, &releases);

        Ok(Installer::new(
            entry.name.as_str(),
            chart,
            brief,
            self.namespace.as_str(),
            self.target.clone(),
            self.component.clone(),
        ))
    }

    async fn archive(&self, entry: &Entry) -> RudderResult<Vec<u8>> {
        let digest = entry.digest.as_deref();
        if let Some(data) = self.cache.get(&entry.name, &entry.version, digest) {
            return Ok(data);
        }
        let data = fetch_first(self.fetcher.as_ref(), &self.info.url, &entry.urls, digest)
            .await
            .with_context(|| format!("download {}-{}", entry.name, entry.version))?;
        self.cache.put(&entry.name, &entry.version, &data)?;
        debug!("Cached {}-{}", entry.name, entry.version);
        Ok(data)
    }

    /// Installers for the releases deployed from this repository whose
    /// package version is still in the catalog.
    pub async fn installed(&self) -> RudderResult<Vec<Installer>> {
        let releases = self.releases().await?;
        let mut installers = Vec::new();
        for release in releases {
            let Some(entry) = self
                .index
                .search(&release.chart_name, Some(&release.chart_version))
                .into_iter()
                .next()
            else {
                continue;
            };
            let mut brief = entry.brief(&self.info.name);
            brief.installed = true;
            installers.push(Installer::deployed(
                release.name,
                brief,
                self.namespace.as_str(),
                self.target.clone(),
                self.component.clone(),
            ));
        }
        Ok(installers)
    }

    /// Re-fetch the catalog; true if anything changed.
    pub async fn update(&self) -> RudderResult<bool> {
        let changed = self
            .index
            .refresh(self.fetcher.as_ref())
            .await
            .with_context(|| format!("update repository {}", self.info.name))?;
        if changed {
            info!("Repository {} updated ({} packages)", self.info.name, self.index.len());
        }
        Ok(changed)
    }

    /// Drop the archive cache.
    pub fn close(&self) -> RudderResult<()> {
        debug!("Closing repository {}", self.info.name);
        self.cache.clear()
    }
}
