use super::{check_namespace, Release, ReleaseRequest};
use crate::core::path::ensure_dir;
use crate::core::{ResultExt, RudderError, RudderResult};
use crate::di::DeploymentTarget;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const RELEASE_FILE: &str = "release.yaml";
const MANIFEST_FILE: &str = "manifest.yaml";

/// Releases materialized on disk
///
/// Layout: `<root>/<namespace>/<release>/{release.yaml,manifest.yaml}`.
pub struct FilesystemTarget {
    root: PathBuf,
    namespace: String,
}

impl FilesystemTarget {
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> RudderResult<Self> {
        let target = Self {
            root: root.into(),
            namespace: namespace.into(),
        };
        ensure_dir(&target.namespace_dir())?;
        Ok(target)
    }

    fn namespace_dir(&self) -> PathBuf {
        self.root.join(&self.namespace)
    }

    fn release_dir(&self, name: &str) -> RudderResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(RudderError::Validation(format!(
                "invalid release name '{}'",
                name
            )));
        }
        Ok(self.namespace_dir().join(name))
    }

    fn read_release(dir: &Path) -> RudderResult<Release> {
        let path = dir.join(RELEASE_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut release: Release = serde_yaml::from_str(&content)
            .with_context(|| format!("Corrupt release record {}", path.display()))?;
        release.manifest = fs::read_to_string(dir.join(MANIFEST_FILE)).unwrap_or_default();
        Ok(release)
    }
}

#[async_trait]
impl DeploymentTarget for FilesystemTarget {
    async fn install(&self, request: ReleaseRequest) -> RudderResult<Release> {
        check_namespace(&self.namespace, &request)?;
        let dir = self.release_dir(&request.name)?;
        if dir.exists() {
            return Err(RudderError::AlreadyExists(format!("release '{}'", request.name)));
        }

        let manifest = request.manifest()?;
        let release = request.into_release(manifest);

        ensure_dir(&dir)?;
        let record = Release {
            manifest: String::new(),
            ..release.clone()
        };
        fs::write(dir.join(MANIFEST_FILE), &release.manifest)?;
        fs::write(dir.join(RELEASE_FILE), serde_yaml::to_string(&record)?)?;

        info!(
            "Installed release {} ({} {}) to {}",
            release.name,
            release.chart_name,
            release.chart_version,
            dir.display()
        );
        Ok(release)
    }

    async fn uninstall(&self, name: &str) -> RudderResult<Release> {
        let dir = self.release_dir(name)?;
        if !dir.join(RELEASE_FILE).exists() {
            return Err(RudderError::NotFound(format!("release '{}'", name)));
        }
        let release = Self::read_release(&dir)?;
        fs::remove_dir_all(&dir)?;
        info!("Uninstalled release {}", name);
        Ok(release)
    }

    async fn list(&self) -> RudderResult<Vec<Release>> {
        let mut releases = Vec::new();
        for entry in fs::read_dir(self.namespace_dir())? {
            let path = entry?.path();
            if !path.join(RELEASE_FILE).is_file() {
                continue;
            }
            match Self::read_release(&path) {
                Ok(release) => releases.push(release),
                Err(e) => warn!("Skipping release at {}: {}", path.display(), e),
            }
        }
        releases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::deploy::testutil::request;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_install_materializes_files() {
        let temp = TempDir::new().unwrap();
        let target = FilesystemTarget::new(temp.path(), "keel-system").unwrap();
        let release = target.install(request("echo-1", "keel-system")).await.unwrap();

        let dir = temp.path().join("keel-system").join("echo-1");
        assert!(dir.join("release.yaml").is_file());
        let manifest = fs::read_to_string(dir.join("manifest.yaml")).unwrap();
        assert_eq!(manifest, release.manifest);

        let listed = target.list().await.unwrap();
        assert_eq!(listed, vec![release]);
    }

    #[tokio::test]
    async fn test_uninstall_removes_directory() {
        let temp = TempDir::new().unwrap();
        let target = FilesystemTarget::new(temp.path(), "keel-system").unwrap();
        target.install(request("echo-1", "keel-system")).await.unwrap();

        let removed = target.uninstall("echo-1").await.unwrap();
        assert_eq!(removed.name, "echo-1");
        assert!(!temp.path().join("keel-system").join("echo-1").exists());
        assert!(target.uninstall("echo-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_release() {
        let temp = TempDir::new().unwrap();
        let target = FilesystemTarget::new(temp.path(), "keel-system").unwrap();
        target.install(request("echo-1", "keel-system")).await.unwrap();
        let err = target
            .install(request("echo-1", "keel-system"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let temp = TempDir::new().unwrap();
        let target = FilesystemTarget::new(temp.path(), "keel-system").unwrap();
        let err = target
            .install(request("../escape", "keel-system"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
