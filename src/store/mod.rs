//! ORDIS - Structured Store
//! Plain values, hashes, sets, sorted sets and lists on top of an
//! [`OrderedStore`].
//!
//! Every user key owns one meta record. Collections additionally own item
//! rows tagged with the meta's current version; reads are always bounded to
//! that version's item prefix, so rows of retired generations are invisible
//! whether or not the sweeper has erased them yet.

pub mod concurrent;
mod hash;
mod kv;
mod list;
mod set;
pub mod version;
mod zset;

use crate::codec::{item_prefix, prefix_upper_bound, MetaKey, MetaVal, MetaValue};
use crate::config::Config;
use crate::engine::{Engine, OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::slot::slot_for;
use crate::types::{DataType, Key, Slot, Value};

use self::version::{next_version, pending_versions, stage_retire, VersionState};

pub use self::concurrent::SharedStore;
pub use self::list::INITIAL_SEQ;

/// Rows fetched per engine scan while paging through a range.
const SCAN_CHUNK: usize = 256;

/// Row recording the slot count the data was written with. Sorts below every
/// meta, item and marker prefix.
const LAYOUT_KEY: &[u8] = b"!slot_count";

/// Structured data-type API over an ordered engine.
pub struct Store<S: OrderedStore = Engine> {
    engine: S,
    slot_count: u16,
}

impl Store<Engine> {
    /// Open a disk-backed store.
    ///
    /// Meta keys and markers are slot-scoped while item rows are not, so a
    /// data directory only opens with the slot count it was created with.
    pub fn open(config: Config) -> Result<Self> {
        let mut engine = Engine::open(config)?;
        let slot_count = engine.config().slot_count;
        check_layout(&mut engine, slot_count)?;
        Ok(Self::new(engine, slot_count))
    }
}

/// Record `slot_count` on first open; afterwards it must match.
fn check_layout<S: OrderedStore>(engine: &mut S, slot_count: u16) -> Result<()> {
    let Some(raw) = engine.get(LAYOUT_KEY)? else {
        engine.put(LAYOUT_KEY.to_vec(), slot_count.to_be_bytes().to_vec())?;
        return Ok(());
    };
    let stored: [u8; 2] = raw
        .as_slice()
        .try_into()
        .map_err(|_| OrdisError::Corruption(format!("layout record of {} bytes", raw.len())))?;
    let stored = u16::from_be_bytes(stored);
    if stored != slot_count {
        return Err(OrdisError::Config(format!(
            "data was written with slot_count {}, configured {}",
            stored, slot_count
        )));
    }
    Ok(())
}

impl<S: OrderedStore> Store<S> {
    pub fn new(engine: S, slot_count: u16) -> Self {
        Self {
            engine,
            slot_count: slot_count.max(1),
        }
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut S {
        &mut self.engine
    }

    /// Slot `key` hashes to.
    pub fn slot(&self, key: &[u8]) -> Slot {
        slot_for(key, self.slot_count)
    }

    fn meta_key(&self, key: &[u8]) -> Vec<u8> {
        MetaKey::new(self.slot(key), key.to_vec()).encode()
    }

    /// Decoded meta record of `key`, dead or alive.
    pub fn load_meta(&self, key: &[u8]) -> Result<Option<MetaValue>> {
        match self.engine.get(&self.meta_key(key))? {
            Some(raw) => Ok(Some(MetaValue::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn stage_meta(&self, batch: &mut WriteBatch, key: &[u8], meta: &MetaValue) {
        batch.put(self.meta_key(key), meta.encode());
    }

    /// Type of the live value at `key`.
    pub fn key_type(&self, key: &[u8]) -> Result<Option<DataType>> {
        let meta = self.load_meta(key)?;
        Ok(live_type(meta.as_ref()))
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.key_type(key)?.is_some())
    }

    /// Remove `key` whatever its type. Returns false if nothing was live.
    ///
    /// Plain values are erased outright. Collections keep their meta record
    /// flagged deleted and queue their rows for the sweeper.
    pub fn del(&mut self, key: &[u8]) -> Result<bool> {
        let Some(meta) = self.load_meta(key)? else {
            return Ok(false);
        };
        let mut batch = WriteBatch::new();
        match &meta {
            MetaValue::Kv(_) => {
                batch.delete(self.meta_key(key));
            }
            _ => {
                if stage_retire(&mut batch, self.slot(key), key, &meta, None).is_none() {
                    return Ok(false);
                }
            }
        }
        self.engine.write(batch)?;
        Ok(true)
    }

    /// Version a new generation of `key` starts at.
    fn fresh_version(&self, key: &[u8], meta: Option<&MetaValue>) -> Result<u16> {
        let pending = pending_versions(&self.engine, self.slot(key), key)?;
        next_version(VersionState::of(meta), &pending)
    }

    /// Live hash/set/zset record of `expected` type at `key`.
    fn live_collection(&self, key: &[u8], expected: DataType) -> Result<Option<MetaVal>> {
        match self.load_meta(key)? {
            Some(MetaValue::Collection(meta)) if meta.is_live() => {
                if meta.data_type == expected {
                    Ok(Some(meta))
                } else {
                    Err(OrdisError::WrongType)
                }
            }
            Some(meta) if live_type(Some(&meta)).is_some() => Err(OrdisError::WrongType),
            _ => Ok(None),
        }
    }

    /// Record to write into: the live one, or an empty new generation.
    fn writable_collection(&self, key: &[u8], expected: DataType) -> Result<MetaVal> {
        check_key(key)?;
        let meta = self.load_meta(key)?;
        match &meta {
            Some(MetaValue::Collection(m)) if m.is_live() => {
                if m.data_type == expected {
                    return Ok(*m);
                }
                return Err(OrdisError::WrongType);
            }
            Some(other) if live_type(Some(other)).is_some() => return Err(OrdisError::WrongType),
            _ => {}
        }
        let version = self.fresh_version(key, meta.as_ref())?;
        log::debug!(
            "new {} generation {} for {:?}",
            expected.name(),
            version,
            String::from_utf8_lossy(key)
        );
        Ok(MetaVal::new(expected, version))
    }

    /// Stage `meta` after an update. An emptied collection is retired like
    /// [`Store::del`] does.
    fn stage_updated_meta(&self, batch: &mut WriteBatch, key: &[u8], meta: MetaValue) {
        if meta_length(&meta) == 0 {
            stage_retire(batch, self.slot(key), key, &meta, None);
        } else {
            self.stage_meta(batch, key, &meta);
        }
    }

    /// Every row under the item prefix of `key` at `version`, in order.
    fn generation_rows(&self, key: &[u8], version: u16) -> Result<Vec<(Key, Value)>> {
        let prefix = item_prefix(key, version);
        let upper = prefix_upper_bound(&prefix);
        self.scan_range(&prefix, upper.as_deref(), usize::MAX, |_, _| true)
    }

    /// Page through `[lower, upper)` keeping up to `limit` rows that pass
    /// `keep`.
    fn scan_range(
        &self,
        lower: &[u8],
        upper: Option<&[u8]>,
        limit: usize,
        mut keep: impl FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<Vec<(Key, Value)>> {
        let mut out = Vec::new();
        let mut cursor = lower.to_vec();
        while out.len() < limit {
            let rows = self.engine.scan(&cursor, upper, SCAN_CHUNK)?;
            let exhausted = rows.len() < SCAN_CHUNK;
            let Some((last, _)) = rows.last() else {
                break;
            };
            cursor = last.clone();
            cursor.push(0);
            for (k, v) in rows {
                if out.len() == limit {
                    break;
                }
                if keep(&k, &v) {
                    out.push((k, v));
                }
            }
            if exhausted {
                break;
            }
        }
        Ok(out)
    }
}

fn meta_length(meta: &MetaValue) -> u64 {
    match meta {
        MetaValue::Kv(_) => 1,
        MetaValue::Collection(m) => m.length,
        MetaValue::List(m) => m.length,
    }
}

fn live_type(meta: Option<&MetaValue>) -> Option<DataType> {
    let meta = meta?;
    match meta {
        MetaValue::Kv(_) => Some(DataType::Kv),
        _ if VersionState::of(Some(meta)).is_live() => Some(meta.data_type()),
        _ => None,
    }
}

/// Keys must fit the 16-bit length prefix of item and marker keys.
fn check_key(key: &[u8]) -> Result<()> {
    if key.len() > u16::MAX as usize {
        return Err(OrdisError::InvalidArgument(format!(
            "key of {} bytes exceeds {} bytes",
            key.len(),
            u16::MAX
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::DeleteKey;

    pub(crate) fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Config::new(dir.path()).with_slot_count(64)).unwrap();
        (dir, store)
    }

    #[test]
    fn test_type_and_exists() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.key_type(b"k").unwrap(), None);
        store.set(b"k", b"v").unwrap();
        store.hset(b"h", b"f", b"v").unwrap();
        assert_eq!(store.key_type(b"k").unwrap(), Some(DataType::Kv));
        assert_eq!(store.key_type(b"h").unwrap(), Some(DataType::Hash));
        assert!(store.exists(b"h").unwrap());
    }

    #[test]
    fn test_del_collection_queues_marker() {
        let (_dir, mut store) = temp_store();
        store.sadd(b"s", &[b"a".to_vec(), b"b".to_vec()]).unwrap();
        assert!(store.del(b"s").unwrap());
        assert!(!store.exists(b"s").unwrap());
        assert!(!store.del(b"s").unwrap());

        let slot = store.slot(b"s");
        let markers = version::pending_markers(store.engine(), 10).unwrap();
        assert_eq!(markers, vec![DeleteKey::new(slot, b"s".to_vec(), 0)]);
        // rows are still physically present
        assert_eq!(store.generation_rows(b"s", 0).unwrap().len(), 2);
    }

    #[test]
    fn test_del_plain_value_erases_meta() {
        let (_dir, mut store) = temp_store();
        store.set(b"k", b"v").unwrap();
        assert!(store.del(b"k").unwrap());
        assert_eq!(store.load_meta(b"k").unwrap(), None);
        assert!(version::pending_markers(store.engine(), 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_recreated_collection_skips_pending_version() {
        let (_dir, mut store) = temp_store();
        store.hset(b"h", b"old", b"1").unwrap();
        store.del(b"h").unwrap();
        store.hset(b"h", b"new", b"2").unwrap();

        match store.load_meta(b"h").unwrap() {
            Some(MetaValue::Collection(meta)) => assert_eq!(meta.version, 1),
            other => panic!("unexpected meta {:?}", other),
        }
        assert_eq!(
            store.hgetall(b"h").unwrap(),
            vec![(b"new".to_vec(), b"2".to_vec())]
        );
    }

    #[test]
    fn test_overlong_key_rejected() {
        let (_dir, mut store) = temp_store();
        let key = vec![b'x'; u16::MAX as usize + 1];
        assert!(matches!(
            store.hset(&key, b"f", b"v"),
            Err(OrdisError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_corrupt_meta_surfaces_as_error() {
        let (_dir, mut store) = temp_store();
        let meta_key = store.meta_key(b"bad");
        store.engine_mut().put(meta_key, vec![b'h', 0]).unwrap();
        assert!(matches!(
            store.hget(b"bad", b"f"),
            Err(OrdisError::Codec(_))
        ));
    }

    #[test]
    fn test_reopen_with_other_slot_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = Store::open(Config::new(dir.path()).with_slot_count(16)).unwrap();
            store.hset(b"user", b"old", b"1").unwrap();
        }
        let reopened = Store::open(Config::new(dir.path()).with_slot_count(16384));
        assert!(matches!(reopened, Err(OrdisError::Config(_))));

        // the original count still opens and sees the data
        let store = Store::open(Config::new(dir.path()).with_slot_count(16)).unwrap();
        assert_eq!(
            store.hgetall(b"user").unwrap(),
            vec![(b"old".to_vec(), b"1".to_vec())]
        );
    }

    #[test]
    fn test_scan_range_pages() {
        let (_dir, mut store) = temp_store();
        let members: Vec<Vec<u8>> = (0..(SCAN_CHUNK * 2 + 7))
            .map(|i| format!("m{:05}", i).into_bytes())
            .collect();
        store.sadd(b"big", &members).unwrap();
        assert_eq!(store.generation_rows(b"big", 0).unwrap().len(), members.len());
        assert_eq!(store.smembers(b"big").unwrap(), members);
    }
}
