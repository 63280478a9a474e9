//! ORDIS - MemTable (In-Memory Sorted Map)
//! Holds every live row of the engine in byte order. The WAL makes it
//! durable; on open it is rebuilt by replaying the log.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::batch::BatchOp;
use crate::types::{Key, Value};

/// In-memory sorted key-value store backed by a BTreeMap.
#[derive(Debug, Default)]
pub struct MemTable {
    /// Sorted map storing key-value pairs.
    entries: BTreeMap<Key, Value>,
    /// Current approximate size in bytes.
    size_bytes: usize,
}

impl MemTable {
    /// Create a new, empty MemTable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the approximate size of the MemTable in bytes.
    pub fn size(&self) -> usize {
        self.size_bytes
    }

    /// Returns the number of entries in the MemTable.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the MemTable is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a key-value pair, replacing any previous value.
    pub fn insert(&mut self, key: Key, value: Value) {
        let entry_size = key.len() + value.len();
        if let Some(old_val) = self.entries.get(&key) {
            self.size_bytes = self.size_bytes.saturating_sub(key.len() + old_val.len());
        }
        self.size_bytes += entry_size;
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Remove a key. Returns true if it was present.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.entries.remove(key) {
            Some(old_val) => {
                self.size_bytes = self.size_bytes.saturating_sub(key.len() + old_val.len());
                true
            }
            None => false,
        }
    }

    /// Apply one batch operation.
    pub fn apply(&mut self, op: BatchOp) {
        match op {
            BatchOp::Put { key, value } => self.insert(key, value),
            BatchOp::Delete { key } => {
                self.remove(&key);
            }
        }
    }

    /// Entries with `lower <= key < upper`, in key order.
    /// `None` leaves the range open above.
    pub fn range<'a>(
        &'a self,
        lower: &[u8],
        upper: Option<&[u8]>,
    ) -> impl Iterator<Item = (&'a Key, &'a Value)> + 'a {
        let upper = match upper {
            Some(upper) if upper <= lower => Some(lower.to_vec()),
            other => other.map(<[u8]>::to_vec),
        };
        let bounds: (Bound<Key>, Bound<Key>) = (
            Bound::Included(lower.to_vec()),
            upper.map_or(Bound::Unbounded, Bound::Excluded),
        );
        self.entries.range(bounds)
    }

    /// Returns a reference to the inner BTreeMap for iteration.
    pub fn entries(&self) -> &BTreeMap<Key, Value> {
        &self.entries
    }
}
