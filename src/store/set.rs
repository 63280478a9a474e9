//! Sets: one `ItemKey` row per member with an empty value.

use std::collections::BTreeSet;

use super::Store;
use crate::codec::{ItemKey, MetaValue};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::Result;
use crate::types::DataType;

impl<S: OrderedStore> Store<S> {
    /// Add `members` to set `key`. Returns how many were not present.
    pub fn sadd(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<usize> {
        let mut meta = self.writable_collection(key, DataType::Set)?;
        let mut batch = WriteBatch::new();
        let mut added = 0;
        let unique: BTreeSet<&[u8]> = members.iter().map(Vec::as_slice).collect();
        for member in unique {
            let row = ItemKey::new(key, meta.version, member).encode();
            if self.engine.get(&row)?.is_none() {
                batch.put(row, Vec::new());
                added += 1;
            }
        }
        if added == 0 {
            return Ok(0);
        }
        meta.length += added as u64;
        self.stage_meta(&mut batch, key, &MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(added)
    }

    /// Remove `members` from set `key`. Returns how many were present.
    pub fn srem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<usize> {
        let Some(mut meta) = self.live_collection(key, DataType::Set)? else {
            return Ok(0);
        };
        let mut batch = WriteBatch::new();
        let mut removed = 0;
        let unique: BTreeSet<&[u8]> = members.iter().map(Vec::as_slice).collect();
        for member in unique {
            let row = ItemKey::new(key, meta.version, member).encode();
            if self.engine.get(&row)?.is_some() {
                batch.delete(row);
                removed += 1;
            }
        }
        if removed == 0 {
            return Ok(0);
        }
        meta.length = meta.length.saturating_sub(removed as u64);
        self.stage_updated_meta(&mut batch, key, MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(removed)
    }

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        match self.live_collection(key, DataType::Set)? {
            Some(meta) => Ok(self
                .engine
                .get(&ItemKey::new(key, meta.version, member).encode())?
                .is_some()),
            None => Ok(false),
        }
    }

    /// Members in byte order.
    pub fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let Some(meta) = self.live_collection(key, DataType::Set)? else {
            return Ok(Vec::new());
        };
        self.generation_rows(key, meta.version)?
            .into_iter()
            .map(|(raw, _)| Ok(ItemKey::decode(&raw)?.field))
            .collect()
    }

    pub fn scard(&self, key: &[u8]) -> Result<u64> {
        Ok(self
            .live_collection(key, DataType::Set)?
            .map_or(0, |meta| meta.length))
    }
}
