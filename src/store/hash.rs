//! Hashes: one `ItemKey` row per field, the row value is the field value.

use std::collections::BTreeMap;

use super::Store;
use crate::codec::{item_prefix, prefix_upper_bound, ItemKey, MetaValue};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::Result;
use crate::types::{DataType, Value};

impl<S: OrderedStore> Store<S> {
    /// Set `field` of hash `key`. Returns true if the field is new.
    pub fn hset(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        let mut meta = self.writable_collection(key, DataType::Hash)?;
        let row = ItemKey::new(key, meta.version, field).encode();
        let created = self.engine.get(&row)?.is_none();

        let mut batch = WriteBatch::new();
        batch.put(row, value.to_vec());
        if created {
            meta.length += 1;
        }
        self.stage_meta(&mut batch, key, &MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(created)
    }

    /// Set every `(field, value)` pair in one batch. A field repeated in
    /// `pairs` takes its last value. Returns how many fields are new.
    pub fn hmset(&mut self, key: &[u8], pairs: &[(Vec<u8>, Vec<u8>)]) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }
        let mut meta = self.writable_collection(key, DataType::Hash)?;
        let latest: BTreeMap<&[u8], &[u8]> = pairs
            .iter()
            .map(|(field, value)| (field.as_slice(), value.as_slice()))
            .collect();

        let mut batch = WriteBatch::new();
        let mut created = 0;
        for (field, value) in latest {
            let row = ItemKey::new(key, meta.version, field).encode();
            if self.engine.get(&row)?.is_none() {
                created += 1;
            }
            batch.put(row, value.to_vec());
        }
        meta.length += created as u64;
        self.stage_meta(&mut batch, key, &MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(created)
    }

    /// Set `field` only if it is absent. Returns true if it was written.
    pub fn hsetnx(&mut self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        let mut meta = self.writable_collection(key, DataType::Hash)?;
        let row = ItemKey::new(key, meta.version, field).encode();
        if self.engine.get(&row)?.is_some() {
            return Ok(false);
        }
        let mut batch = WriteBatch::new();
        batch.put(row, value.to_vec());
        meta.length += 1;
        self.stage_meta(&mut batch, key, &MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(true)
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Value>> {
        match self.live_collection(key, DataType::Hash)? {
            Some(meta) => self.engine.get(&ItemKey::new(key, meta.version, field).encode()),
            None => Ok(None),
        }
    }

    /// Remove `fields` from hash `key`. Returns how many existed.
    pub fn hdel(&mut self, key: &[u8], fields: &[Vec<u8>]) -> Result<usize> {
        let Some(mut meta) = self.live_collection(key, DataType::Hash)? else {
            return Ok(0);
        };
        let mut batch = WriteBatch::new();
        let mut removed = 0;
        let mut seen = std::collections::HashSet::new();
        for field in fields {
            if !seen.insert(field.as_slice()) {
                continue;
            }
            let row = ItemKey::new(key, meta.version, field.as_slice()).encode();
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

    /// Every `(field, value)` pair in field order.
    pub fn hgetall(&self, key: &[u8]) -> Result<Vec<(Vec<u8>, Value)>> {
        let Some(meta) = self.live_collection(key, DataType::Hash)? else {
            return Ok(Vec::new());
        };
        self.generation_rows(key, meta.version)?
            .into_iter()
            .map(|(raw, value)| Ok((ItemKey::decode(&raw)?.field, value)))
            .collect()
    }

    /// Values of `fields`, position for position.
    pub fn hmget(&self, key: &[u8], fields: &[Vec<u8>]) -> Result<Vec<Option<Value>>> {
        let Some(meta) = self.live_collection(key, DataType::Hash)? else {
            return Ok(vec![None; fields.len()]);
        };
        fields
            .iter()
            .map(|field| {
                self.engine
                    .get(&ItemKey::new(key, meta.version, field.as_slice()).encode())
            })
            .collect()
    }

    pub fn hkeys(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(self.hgetall(key)?.into_iter().map(|(field, _)| field).collect())
    }

    pub fn hvals(&self, key: &[u8]) -> Result<Vec<Value>> {
        Ok(self.hgetall(key)?.into_iter().map(|(_, value)| value).collect())
    }

    /// Up to `limit` pairs with `start < field <= end`, in field order. An
    /// empty `start` or `end` leaves that side open.
    pub fn hscan(
        &self,
        key: &[u8],
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Value)>> {
        let Some(meta) = self.live_collection(key, DataType::Hash)? else {
            return Ok(Vec::new());
        };
        let prefix = item_prefix(key, meta.version);
        // the smallest row key past `field`
        let just_after = |field: &[u8]| {
            let mut row = ItemKey::new(key, meta.version, field).encode();
            row.push(0);
            row
        };
        let lower = if start.is_empty() {
            prefix.clone()
        } else {
            just_after(start)
        };
        let upper = if end.is_empty() {
            prefix_upper_bound(&prefix)
        } else {
            Some(just_after(end))
        };
        if matches!(&upper, Some(upper) if lower >= *upper) {
            return Ok(Vec::new());
        }
        self.scan_range(&lower, upper.as_deref(), limit, |_, _| true)?
            .into_iter()
            .map(|(raw, value)| Ok((ItemKey::decode(&raw)?.field, value)))
            .collect()
    }

    pub fn hlen(&self, key: &[u8]) -> Result<u64> {
        Ok(self
            .live_collection(key, DataType::Hash)?
            .map_or(0, |meta| meta.length))
    }

    pub fn hexists(&self, key: &[u8], field: &[u8]) -> Result<bool> {
        Ok(self.hget(key, field)?.is_some())
    }
}
