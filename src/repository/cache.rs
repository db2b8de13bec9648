use crate::catalog::{digest_hex, is_path_safe};
use crate::core::path::ensure_dir;
use crate::core::{RudderError, RudderResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk cache of chart archives for one repository
#[derive(Debug, Clone)]
pub struct ChartCache {
    dir: PathBuf,
}

impl ChartCache {
    pub fn new(dir: PathBuf) -> RudderResult<Self> {
        ensure_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_path(&self, name: &str, version: &str) -> RudderResult<PathBuf> {
        if !is_path_safe(name) || !is_path_safe(version) {
            return Err(RudderError::Validation(format!(
                "invalid chart archive name '{}-{}'",
                name, version
            )));
        }
        Ok(self.dir.join(format!("{}-{}.tgz", name, version)))
    }

    /// The cached archive, if present and matching `digest` when one is
    /// given.
    pub fn get(&self, name: &str, version: &str, digest: Option<&str>) -> Option<Vec<u8>> {
        let path = self.archive_path(name, version).ok()?;
        let data = fs::read(&path).ok()?;
        if let Some(expected) = digest {
            if !expected.eq_ignore_ascii_case(&digest_hex(&data)) {
                debug!("Stale cache entry {}", path.display());
                return None;
            }
        }
        debug!("Cache hit {}", path.display());
        Some(data)
    }

    pub fn put(&self, name: &str, version: &str, data: &[u8]) -> RudderResult<()> {
        let path = self.archive_path(name, version)?;
        ensure_dir(&self.dir)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Remove the cache directory and everything in it.
    pub fn clear(&self) -> RudderResult<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_get() {
        let temp = TempDir::new().unwrap();
        let cache = ChartCache::new(temp.path().join("official")).unwrap();
        assert!(cache.get("echo", "0.1.0", None).is_none());

        cache.put("echo", "0.1.0", b"archive").unwrap();
        assert_eq!(cache.get("echo", "0.1.0", None).unwrap(), b"archive");
        let digest = digest_hex(b"archive");
        assert!(cache.get("echo", "0.1.0", Some(&digest)).is_some());
        assert!(cache.get("echo", "0.1.0", Some("00ff")).is_none());
    }

    #[test]
    fn test_rejects_escaping_names() {
        let temp = TempDir::new().unwrap();
        let cache = ChartCache::new(temp.path().join("a").join("b")).unwrap();
        let err = cache.put("../../escaped", "1.0.0", b"archive").unwrap_err();
        assert!(matches!(err, RudderError::Validation(_)));
        assert!(cache.put("escaped", "../1.0.0", b"archive").is_err());
        assert!(!temp.path().join("escaped-1.0.0.tgz").exists());
        assert!(!temp.path().join("a").join("escaped-1.0.0.tgz").exists());
        assert!(cache.get("../../escaped", "1.0.0", None).is_none());
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let cache = ChartCache::new(temp.path().join("official")).unwrap();
        cache.put("echo", "0.1.0", b"archive").unwrap();
        cache.clear().unwrap();
        assert!(!cache.dir().exists());
        cache.clear().unwrap();
    }
}
