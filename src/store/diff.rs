use crate::core::{Info, RecordMap};

/// Records that changed between two snapshots, each list ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    pub news: Vec<Info>,
    pub updates: Vec<Info>,
    pub deletes: Vec<Info>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.news.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.news.len() + self.updates.len() + self.deletes.len()
    }
}

/// Classify the records of `new` against `old`.
///
/// A name only in `new` is new; a name only in `old` is deleted; a name in
/// both is updated when its version differs.
pub fn diff(old: &RecordMap, new: &RecordMap) -> Changes {
    let mut changes = Changes::default();

    for (name, record) in new {
        match old.get(name) {
            None => changes.news.push(record.info.clone()),
            Some(previous) if previous.version != record.version => {
                changes.updates.push(record.info.clone())
            }
            Some(_) => {}
        }
    }

    changes.deletes = old
        .iter()
        .filter(|(name, _)| !new.contains_key(*name))
        .map(|(_, record)| record.info.clone())
        .collect();

    changes
}
