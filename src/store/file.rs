use super::memory::check_etag;
use crate::core::path::ensure_dir;
use crate::core::{ResultExt, RudderError, RudderResult};
use crate::di::{StateBackend, StateItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// State backend keeping one JSON file per key in a directory
///
/// The etag of a value is its SHA-256, so equal content always reports an
/// equal etag. Writes go to a temporary file that is renamed into place.
pub struct FileState {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    etag: String,
    value: String,
}

impl FileState {
    pub fn new(dir: impl Into<PathBuf>) -> RudderResult<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read(&self, key: &str) -> RudderResult<Option<StateItem>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let envelope: Envelope = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt state file {}", path.display()))?;
        Ok(Some(StateItem {
            etag: envelope.etag,
            value: envelope.value.into_bytes(),
        }))
    }
}

fn etag_of(value: &[u8]) -> String {
    hex::encode(Sha256::digest(value))
}

#[async_trait]
impl StateBackend for FileState {
    async fn get(&self, key: &str) -> RudderResult<Option<StateItem>> {
        self.read(key)
    }

    async fn save(&self, key: &str, value: Vec<u8>, etag: Option<String>) -> RudderResult<String> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.read(key)?;
        check_etag(
            key,
            current.as_ref().map(|i| i.etag.as_str()),
            etag.as_deref(),
        )?;

        let new_etag = etag_of(&value);
        let envelope = Envelope {
            etag: new_etag.clone(),
            value: String::from_utf8(value).map_err(|e| {
                RudderError::Validation(format!("state value for '{}' is not UTF-8: {}", key, e))
            })?,
        };
        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, serde_json::to_vec_pretty(&envelope)?)?;
        fs::rename(&tmp, &path)?;
        Ok(new_etag)
    }

    async fn delete(&self, key: &str, etag: Option<String>) -> RudderResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self
            .read(key)?
            .ok_or_else(|| RudderError::NotFound(format!("state key '{}'", key)))?;
        check_etag(key, Some(current.etag.as_str()), etag.as_deref())?;
        fs::remove_file(self.key_path(key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, Info};
    use crate::di::InfoStore;
    use crate::store::StateInfoStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let temp = TempDir::new().unwrap();
        let state = FileState::new(temp.path()).unwrap();
        let etag = state.save("k", b"{\"a\":1}".to_vec(), None).await.unwrap();

        let reopened = FileState::new(temp.path()).unwrap();
        let item = reopened.get("k").await.unwrap().unwrap();
        assert_eq!(item.etag, etag);
        assert_eq!(item.value, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_conflict_on_stale_etag() {
        let temp = TempDir::new().unwrap();
        let state = FileState::new(temp.path()).unwrap();
        let first = state.save("k", b"1".to_vec(), None).await.unwrap();
        state.save("k", b"2".to_vec(), Some(first.clone())).await.unwrap();

        let err = state.save("k", b"3".to_vec(), Some(first)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
    }

    #[tokio::test]
    async fn test_info_store_over_files() {
        let temp = TempDir::new().unwrap();
        let store = StateInfoStore::new(FileState::new(temp.path()).unwrap());
        let info = Info::new("official", "https://charts.example.com");
        store.create(&info).await.unwrap();

        let reopened = StateInfoStore::new(FileState::new(temp.path()).unwrap());
        assert_eq!(reopened.get("official").await.unwrap(), info);

        reopened.delete("official").await.unwrap();
        assert!(!temp.path().join("plugin_repo_map.json").exists());
    }
}
