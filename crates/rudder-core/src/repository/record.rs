use super::Info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A repository record as kept by the durable store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub info: Info,

    /// Stamped from a store-wide sequence on every write, so it never
    /// repeats for a name; compared when diffing snapshots
    pub version: u64,
}

impl VersionedRecord {
    pub fn new(info: Info, version: u64) -> Self {
        Self { info, version }
    }
}

/// name → record, ordered by name
pub type RecordMap = BTreeMap<String, VersionedRecord>;
