//! Lists: one `ListItemKey` row per element, addressed by a sequence number.
//! The meta record tracks the occupied window `[left, right]`; pushes grow it
//! at either end and pops shrink it.

use super::{check_key, live_type, Store};
use crate::codec::{item_prefix, prefix_upper_bound, ListItemKey, ListMetaVal, MetaValue};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::types::Value;

/// Sequence number of the first element of a new list.
pub const INITIAL_SEQ: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Left,
    Right,
}

fn seq_exhausted() -> OrdisError {
    OrdisError::InvalidArgument("list sequence space exhausted".into())
}

/// Resolve a possibly negative index against a list of `len` elements.
fn resolve_index(index: i64, len: u64) -> Option<u64> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as u64)
}

impl<S: OrderedStore> Store<S> {
    /// Live list record at `key`.
    fn live_list(&self, key: &[u8]) -> Result<Option<ListMetaVal>> {
        match self.load_meta(key)? {
            Some(MetaValue::List(meta)) if meta.is_live() => Ok(Some(meta)),
            meta if live_type(meta.as_ref()).is_some() => Err(OrdisError::WrongType),
            _ => Ok(None),
        }
    }

    fn push(&mut self, key: &[u8], values: &[Vec<u8>], end: End) -> Result<u64> {
        check_key(key)?;
        let mut meta = self.live_list(key)?;
        if values.is_empty() {
            return Ok(meta.map_or(0, |m| m.length));
        }

        let mut batch = WriteBatch::new();
        for value in values {
            let (version, seq) = match meta.as_mut() {
                Some(m) => {
                    let seq = match end {
                        End::Left => {
                            m.left = m.left.checked_sub(1).ok_or_else(seq_exhausted)?;
                            m.left
                        }
                        End::Right => {
                            m.right = m.right.checked_add(1).ok_or_else(seq_exhausted)?;
                            m.right
                        }
                    };
                    m.length += 1;
                    (m.version, seq)
                }
                None => {
                    let old = self.load_meta(key)?;
                    let version = self.fresh_version(key, old.as_ref())?;
                    meta = Some(ListMetaVal::new(version, INITIAL_SEQ));
                    (version, INITIAL_SEQ)
                }
            };
            batch.put(ListItemKey::new(key, version, seq).encode(), value.clone());
        }

        let Some(meta) = meta else {
            return Ok(0);
        };
        self.stage_meta(&mut batch, key, &MetaValue::List(meta));
        self.engine.write(batch)?;
        Ok(meta.length)
    }

    /// Prepend `values` one by one, so the last ends up first.
    /// Returns the new length.
    pub fn lpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.push(key, values, End::Left)
    }

    /// Append `values`. Returns the new length.
    pub fn rpush(&mut self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.push(key, values, End::Right)
    }

    fn pop(&mut self, key: &[u8], end: End) -> Result<Option<Value>> {
        let Some(mut meta) = self.live_list(key)?.filter(|m| m.length > 0) else {
            return Ok(None);
        };
        let seq = match end {
            End::Left => meta.left,
            End::Right => meta.right,
        };
        let row = ListItemKey::new(key, meta.version, seq).encode();
        let value = self.engine.get(&row)?.ok_or_else(|| {
            OrdisError::Corruption(format!(
                "list element {} of version {} is missing",
                seq, meta.version
            ))
        })?;

        let mut batch = WriteBatch::new();
        batch.delete(row);
        meta.length -= 1;
        if meta.length > 0 {
            match end {
                End::Left => meta.left += 1,
                End::Right => meta.right -= 1,
            }
        }
        self.stage_updated_meta(&mut batch, key, MetaValue::List(meta));
        self.engine.write(batch)?;
        Ok(Some(value))
    }

    pub fn lpop(&mut self, key: &[u8]) -> Result<Option<Value>> {
        self.pop(key, End::Left)
    }

    pub fn rpop(&mut self, key: &[u8]) -> Result<Option<Value>> {
        self.pop(key, End::Right)
    }

    /// Elements `start..=stop`; negative indexes count from the tail.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Value>> {
        let Some(meta) = self.live_list(key)? else {
            return Ok(Vec::new());
        };
        let len = i64::try_from(meta.length)
            .map_err(|_| OrdisError::Corruption("list length overflows i64".into()))?;
        let start = if start < 0 { (start + len).max(0) } else { start };
        let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        let first = meta.left + start as u64;
        let last = meta.left + stop as u64;
        let lower = ListItemKey::new(key, meta.version, first).encode();
        let upper = match last.checked_add(1) {
            Some(next) => Some(ListItemKey::new(key, meta.version, next).encode()),
            None => prefix_upper_bound(&item_prefix(key, meta.version)),
        };
        let want = (stop - start + 1) as usize;
        let rows = self.scan_range(&lower, upper.as_deref(), want, |_, _| true)?;
        if rows.len() != want {
            return Err(OrdisError::Corruption(format!(
                "list window [{}, {}] holds {} of {} rows",
                first,
                last,
                rows.len(),
                want
            )));
        }
        Ok(rows.into_iter().map(|(_, value)| value).collect())
    }

    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Option<Value>> {
        let Some(meta) = self.live_list(key)? else {
            return Ok(None);
        };
        let Some(offset) = resolve_index(index, meta.length) else {
            return Ok(None);
        };
        let seq = meta.left + offset;
        match self.engine.get(&ListItemKey::new(key, meta.version, seq).encode())? {
            Some(value) => Ok(Some(value)),
            None => Err(OrdisError::Corruption(format!(
                "list element {} of version {} is missing",
                seq, meta.version
            ))),
        }
    }

    pub fn llen(&self, key: &[u8]) -> Result<u64> {
        Ok(self.live_list(key)?.map_or(0, |meta| meta.length))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::temp_store;
    use super::*;

    fn values(items: &[&str]) -> Vec<Vec<u8>> {
        items.iter().map(|v| v.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_push_order() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.rpush(b"l", &values(&["b", "c"])).unwrap(), 2);
        assert_eq!(store.lpush(b"l", &values(&["a", "z"])).unwrap(), 4);
        assert_eq!(
            store.lrange(b"l", 0, -1).unwrap(),
            values(&["z", "a", "b", "c"])
        );
        assert_eq!(store.llen(b"l").unwrap(), 4);
    }

    #[test]
    fn test_first_element_at_initial_seq() {
        let (_dir, mut store) = temp_store();
        store.lpush(b"l", &values(&["x"])).unwrap();
        match store.load_meta(b"l").unwrap() {
            Some(MetaValue::List(meta)) => {
                assert_eq!((meta.left, meta.right, meta.length), (INITIAL_SEQ, INITIAL_SEQ, 1));
            }
            other => panic!("unexpected meta {:?}", other),
        }
    }

    #[test]
    fn test_pops_until_empty() {
        let (_dir, mut store) = temp_store();
        store.rpush(b"l", &values(&["a", "b", "c"])).unwrap();
        assert_eq!(store.lpop(b"l").unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.rpop(b"l").unwrap(), Some(b"c".to_vec()));
        assert_eq!(store.lrange(b"l", 0, -1).unwrap(), values(&["b"]));
        assert_eq!(store.rpop(b"l").unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.lpop(b"l").unwrap(), None);
        assert!(!store.exists(b"l").unwrap());

        // a fresh list after emptying starts a new generation
        store.rpush(b"l", &values(&["n"])).unwrap();
        assert_eq!(store.lrange(b"l", 0, -1).unwrap(), values(&["n"]));
    }

    #[test]
    fn test_lrange_negative_indexes() {
        let (_dir, mut store) = temp_store();
        store.rpush(b"l", &values(&["0", "1", "2", "3", "4"])).unwrap();
        assert_eq!(store.lrange(b"l", -2, -1).unwrap(), values(&["3", "4"]));
        assert_eq!(store.lrange(b"l", 1, 2).unwrap(), values(&["1", "2"]));
        assert_eq!(store.lrange(b"l", -100, 0).unwrap(), values(&["0"]));
        assert_eq!(store.lrange(b"l", 3, 100).unwrap(), values(&["3", "4"]));
        assert!(store.lrange(b"l", 4, 2).unwrap().is_empty());
        assert!(store.lrange(b"l", 5, 9).unwrap().is_empty());
        assert!(store.lrange(b"l", 0, -6).unwrap().is_empty());
    }

    #[test]
    fn test_lindex() {
        let (_dir, mut store) = temp_store();
        store.rpush(b"l", &values(&["a", "b"])).unwrap();
        assert_eq!(store.lindex(b"l", 0).unwrap(), Some(b"a".to_vec()));
        assert_eq!(store.lindex(b"l", -1).unwrap(), Some(b"b".to_vec()));
        assert_eq!(store.lindex(b"l", 2).unwrap(), None);
        assert_eq!(store.lindex(b"l", -3).unwrap(), None);
    }

    #[test]
    fn test_missing_row_is_corruption() {
        let (_dir, mut store) = temp_store();
        store.rpush(b"l", &values(&["a", "b"])).unwrap();
        let row = ListItemKey::new(b"l".to_vec(), 0, INITIAL_SEQ + 1).encode();
        store.engine_mut().delete(row).unwrap();
        assert!(matches!(
            store.lrange(b"l", 0, -1),
            Err(OrdisError::Corruption(_))
        ));
        assert!(matches!(
            store.rpop(b"l"),
            Err(OrdisError::Corruption(_))
        ));
    }

    #[test]
    fn test_list_ops_on_set_are_wrong_type() {
        let (_dir, mut store) = temp_store();
        store.sadd(b"s", &values(&["m"])).unwrap();
        assert!(matches!(
            store.rpush(b"s", &values(&["x"])),
            Err(OrdisError::WrongType)
        ));
        assert!(matches!(store.llen(b"s"), Err(OrdisError::WrongType)));
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(0, 3), Some(0));
        assert_eq!(resolve_index(-1, 3), Some(2));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(-4, 3), None);
        assert_eq!(resolve_index(0, 0), None);
    }
}
