use super::diff::{diff, Changes};
use crate::core::{RecordMap, RudderResult};
use crate::di::InfoStore;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch::Receiver;
use tracing::{debug, info};

/// Decode a raw record document; empty data is an empty map.
pub fn decode_records(data: &[u8]) -> RudderResult<RecordMap> {
    if data.is_empty() {
        return Ok(RecordMap::new());
    }
    Ok(serde_json::from_slice(data)?)
}

/// Last observed store state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub token: Option<String>,
    pub records: RecordMap,
}

impl Snapshot {
    pub async fn read(store: &dyn InfoStore) -> RudderResult<Self> {
        let raw = store.fetch_raw().await?;
        Ok(Self {
            records: decode_records(&raw.data)?,
            token: raw.token,
        })
    }
}

/// Poll `store` until shutdown, calling `callback` with each non-empty diff.
///
/// The sleep starts after an evaluation completes, so a slow callback never
/// overlaps the next poll. The new snapshot is adopted only after the
/// callback returns. Transport, decode, and callback failures end the loop
/// with a fatal error. Returns `Ok(())` once `shutdown` fires or its sender
/// is dropped.
pub async fn watch<F, Fut>(
    store: &dyn InfoStore,
    interval: Duration,
    seed: Snapshot,
    mut shutdown: Receiver<bool>,
    mut callback: F,
) -> RudderResult<()>
where
    F: FnMut(Changes) -> Fut,
    Fut: Future<Output = RudderResult<()>>,
{
    let mut last = seed;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                info!("Watch loop stopped");
                return Ok(());
            }
        }

        let raw = tokio::select! {
            raw = store.fetch_raw() => raw.map_err(|e| e.context("watch: fetch snapshot").into_fatal())?,
            _ = shutdown.changed() => {
                info!("Watch loop stopped");
                return Ok(());
            }
        };

        if raw.token == last.token {
            continue;
        }

        let records = decode_records(&raw.data)
            .map_err(|e| e.context("watch: decode snapshot").into_fatal())?;
        let changes = diff(&last.records, &records);
        if !changes.is_empty() {
            debug!(
                "Store changed: {} new, {} updated, {} deleted",
                changes.news.len(),
                changes.updates.len(),
                changes.deletes.len()
            );
            callback(changes)
                .await
                .map_err(|e| e.context("watch: apply changes").into_fatal())?;
        }

        last = Snapshot {
            token: raw.token,
            records,
        };
    }
}
