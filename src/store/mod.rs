//! Durable storage of repository records.
//!
//! The whole [`RecordMap`] lives as one JSON document under a single key of
//! a [`StateBackend`]. Every write carries the etag read just before it, so
//! concurrent writers surface as `VersionConflict` instead of overwriting
//! each other. Record versions come from a sequence under a second key that
//! outlives the record document, so a deleted and re-created record never
//! shows the watcher its old version again.

pub mod diff;
pub mod file;
pub mod memory;
pub mod watch;

pub use diff::{diff, Changes};
pub use file::FileState;
pub use memory::MemoryState;
pub use watch::{decode_records, watch, Snapshot};

use crate::core::{Info, RecordMap, RudderError, RudderResult, VersionedRecord};
use crate::di::{InfoStore, RawSnapshot, StateBackend};
use async_trait::async_trait;
use tracing::debug;

/// Key under which the record document is stored
pub const REPO_MAP_KEY: &str = "plugin_repo_map";

/// Key of the record version sequence
pub const VERSION_SEQ_KEY: &str = "plugin_repo_seq";

/// [`InfoStore`] over a key/value state backend
pub struct StateInfoStore<B> {
    backend: B,
}

impl<B: StateBackend> StateInfoStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn load(&self) -> RudderResult<(RecordMap, Option<String>)> {
        match self.backend.get(REPO_MAP_KEY).await? {
            Some(item) => Ok((decode_records(&item.value)?, Some(item.etag))),
            None => Ok((RecordMap::new(), None)),
        }
    }

    /// Reserve the next record version.
    ///
    /// Never below the newest version already in `records`.
    async fn next_version(&self, records: &RecordMap) -> RudderResult<u64> {
        let (current, etag) = match self.backend.get(VERSION_SEQ_KEY).await? {
            Some(item) => (serde_json::from_slice::<u64>(&item.value)?, Some(item.etag)),
            None => (0, None),
        };
        let floor = records.values().map(|r| r.version).max().unwrap_or(0);
        let next = current.max(floor) + 1;
        self.backend
            .save(VERSION_SEQ_KEY, serde_json::to_vec(&next)?, etag)
            .await?;
        Ok(next)
    }

    async fn store(&self, records: &RecordMap, etag: Option<String>) -> RudderResult<()> {
        if records.is_empty() {
            if etag.is_some() {
                self.backend.delete(REPO_MAP_KEY, etag).await?;
            }
            return Ok(());
        }
        let value = serde_json::to_vec(records)?;
        let etag = self.backend.save(REPO_MAP_KEY, value, etag).await?;
        debug!("Saved {} repository record(s), etag {}", records.len(), etag);
        Ok(())
    }
}

#[async_trait]
impl<B: StateBackend> InfoStore for StateInfoStore<B> {
    async fn create(&self, info: &Info) -> RudderResult<()> {
        let (mut records, etag) = self.load().await?;
        if records.contains_key(&info.name) {
            return Err(RudderError::AlreadyExists(format!(
                "repository '{}'",
                info.name
            )));
        }
        let version = self.next_version(&records).await?;
        records.insert(info.name.clone(), VersionedRecord::new(info.clone(), version));
        self.store(&records, etag).await
    }

    async fn get(&self, name: &str) -> RudderResult<Info> {
        let (records, _) = self.load().await?;
        records
            .get(name)
            .map(|r| r.info.clone())
            .ok_or_else(|| RudderError::NotFound(format!("repository '{}'", name)))
    }

    async fn delete(&self, name: &str) -> RudderResult<Info> {
        let (mut records, etag) = self.load().await?;
        let removed = records
            .remove(name)
            .ok_or_else(|| RudderError::NotFound(format!("repository '{}'", name)))?;
        self.store(&records, etag).await?;
        Ok(removed.info)
    }

    async fn list(&self) -> RudderResult<Vec<Info>> {
        let (records, _) = self.load().await?;
        Ok(records.into_values().map(|r| r.info).collect())
    }

    async fn update(&self, info: &Info) -> RudderResult<()> {
        let (mut records, etag) = self.load().await?;
        if !records.contains_key(&info.name) {
            return Err(RudderError::NotFound(format!("repository '{}'", info.name)));
        }
        let version = self.next_version(&records).await?;
        records.insert(info.name.clone(), VersionedRecord::new(info.clone(), version));
        self.store(&records, etag).await
    }

    async fn fetch_raw(&self) -> RudderResult<RawSnapshot> {
        Ok(match self.backend.get(REPO_MAP_KEY).await? {
            Some(item) => RawSnapshot {
                token: Some(item.etag),
                data: item.value,
            },
            None => RawSnapshot::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;

    fn store() -> StateInfoStore<MemoryState> {
        StateInfoStore::new(MemoryState::new())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let info = Info::new("official", "https://charts.example.com");
        store.create(&info).await.unwrap();
        assert_eq!(store.get("official").await.unwrap(), info);
    }

    #[tokio::test]
    async fn test_create_duplicate() {
        let store = store();
        let info = Info::new("official", "https://charts.example.com");
        store.create(&info).await.unwrap();
        let err = store.create(&info).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let store = store();
        assert!(store.get("nope").await.unwrap_err().is_not_found());
        assert!(store.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_returns_record_and_clears_key() {
        let store = store();
        let info = Info::new("official", "https://charts.example.com");
        store.create(&info).await.unwrap();
        assert_eq!(store.delete("official").await.unwrap(), info);
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.fetch_raw().await.unwrap(), RawSnapshot::default());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = store();
        store
            .create(&Info::new("official", "https://a.example.com"))
            .await
            .unwrap();
        store
            .update(&Info::new("official", "https://b.example.com"))
            .await
            .unwrap();

        let raw = store.fetch_raw().await.unwrap();
        let records = decode_records(&raw.data).unwrap();
        assert_eq!(records["official"].version, 2);
        assert_eq!(records["official"].info.url, "https://b.example.com");
    }

    #[tokio::test]
    async fn test_recreate_never_repeats_version() {
        let store = store();
        store
            .create(&Info::new("official", "https://a.example.com"))
            .await
            .unwrap();
        let first = decode_records(&store.fetch_raw().await.unwrap().data).unwrap();

        store.delete("official").await.unwrap();
        store
            .create(&Info::new("official", "https://b.example.com"))
            .await
            .unwrap();
        let second = decode_records(&store.fetch_raw().await.unwrap().data).unwrap();

        assert!(second["official"].version > first["official"].version);
        let changes = diff(&first, &second);
        assert_eq!(changes.updates.len(), 1);
    }

    #[tokio::test]
    async fn test_version_sequence_survives_legacy_records() {
        let store = store();
        let mut legacy = RecordMap::new();
        legacy.insert(
            "official".to_string(),
            VersionedRecord::new(Info::new("official", "https://a.example.com"), 7),
        );
        store
            .backend()
            .save(REPO_MAP_KEY, serde_json::to_vec(&legacy).unwrap(), None)
            .await
            .unwrap();

        store
            .create(&Info::new("other", "https://b.example.com"))
            .await
            .unwrap();
        let records = decode_records(&store.fetch_raw().await.unwrap().data).unwrap();
        assert_eq!(records["other"].version, 8);
    }

    #[tokio::test]
    async fn test_update_missing() {
        let store = store();
        let err = store
            .update(&Info::new("official", "https://a.example.com"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_token_changes_on_write() {
        let store = store();
        store
            .create(&Info::new("a", "https://a.example.com"))
            .await
            .unwrap();
        let first = store.fetch_raw().await.unwrap().token;
        assert_eq!(store.fetch_raw().await.unwrap().token, first);

        store
            .create(&Info::new("b", "https://b.example.com"))
            .await
            .unwrap();
        assert_ne!(store.fetch_raw().await.unwrap().token, first);
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = store();
        store
            .create(&Info::new("a", "https://a.example.com"))
            .await
            .unwrap();
        let stale = store.fetch_raw().await.unwrap().token;
        store
            .create(&Info::new("b", "https://b.example.com"))
            .await
            .unwrap();

        let err = store
            .backend()
            .save(REPO_MAP_KEY, b"{}".to_vec(), stale)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict);
    }
}
