use super::{check_namespace, Release, ReleaseRequest};
use crate::core::{RudderError, RudderResult};
use crate::di::DeploymentTarget;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Releases kept in process memory
#[derive(Clone)]
pub struct MemoryTarget {
    namespace: String,
    releases: Arc<Mutex<BTreeMap<String, Release>>>,
}

impl MemoryTarget {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            releases: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl DeploymentTarget for MemoryTarget {
    async fn install(&self, request: ReleaseRequest) -> RudderResult<Release> {
        check_namespace(&self.namespace, &request)?;
        if self
            .releases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&request.name)
        {
            return Err(RudderError::AlreadyExists(format!("release '{}'", request.name)));
        }

        let manifest = request.manifest()?;
        let release = request.into_release(manifest);

        let mut releases = self.releases.lock().unwrap_or_else(|e| e.into_inner());
        if releases.contains_key(&release.name) {
            return Err(RudderError::AlreadyExists(format!("release '{}'", release.name)));
        }
        releases.insert(release.name.clone(), release.clone());
        info!("Installed release {} ({} {})", release.name, release.chart_name, release.chart_version);
        Ok(release)
    }

    async fn uninstall(&self, name: &str) -> RudderResult<Release> {
        let release = self
            .releases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .ok_or_else(|| RudderError::NotFound(format!("release '{}'", name)))?;
        info!("Uninstalled release {}", name);
        Ok(release)
    }

    async fn list(&self) -> RudderResult<Vec<Release>> {
        let releases = self.releases.lock().unwrap_or_else(|e| e.into_inner());
        Ok(releases.values().cloned().collect())
    }
}
