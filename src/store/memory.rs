use crate::core::{RudderError, RudderResult};
use crate::di::{StateBackend, StateItem};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Process-local state backend
///
/// Etags come from one counter shared by all keys, so a deleted and
/// re-created key never repeats an earlier etag.
#[derive(Clone, Default)]
pub struct MemoryState {
    items: Arc<Mutex<HashMap<String, StateItem>>>,
    generation: Arc<AtomicU64>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn check_etag(key: &str, current: Option<&str>, expected: Option<&str>) -> RudderResult<()> {
    if current == expected {
        return Ok(());
    }
    Err(RudderError::VersionConflict(format!(
        "key '{}' has etag {:?}, write expected {:?}",
        key, current, expected
    )))
}

#[async_trait]
impl StateBackend for MemoryState {
    async fn get(&self, key: &str) -> RudderResult<Option<StateItem>> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(key).cloned())
    }

    async fn save(&self, key: &str, value: Vec<u8>, etag: Option<String>) -> RudderResult<String> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        check_etag(key, items.get(key).map(|i| i.etag.as_str()), etag.as_deref())?;
        let etag = (self.generation.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        items.insert(
            key.to_string(),
            StateItem {
                etag: etag.clone(),
                value,
            },
        );
        Ok(etag)
    }

    async fn delete(&self, key: &str, etag: Option<String>) -> RudderResult<()> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let current = items.get(key).map(|i| i.etag.clone());
        if current.is_none() {
            return Err(RudderError::NotFound(format!("state key '{}'", key)));
        }
        check_etag(key, current.as_deref(), etag.as_deref())?;
        items.remove(key);
        Ok(())
    }
}
