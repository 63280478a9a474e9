//! Plain string values.

use super::version::stage_retire;
use super::{check_key, live_type, Store};
use crate::codec::{KvMetaVal, MetaValue};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::types::Value;

impl<S: OrderedStore> Store<S> {
    /// Store `value` at `key`, replacing whatever lived there.
    ///
    /// A live collection at `key` is retired in the same batch.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        check_key(key)?;
        let replacement = MetaValue::from(KvMetaVal::new(value.to_vec()));
        let mut batch = WriteBatch::new();
        let retired = match self.load_meta(key)? {
            Some(old) if !matches!(old, MetaValue::Kv(_)) => stage_retire(
                &mut batch,
                self.slot(key),
                key,
                &old,
                Some(replacement.clone()),
            ),
            _ => None,
        };
        if retired.is_none() {
            self.stage_meta(&mut batch, key, &replacement);
        }
        self.engine.write(batch)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        match self.load_meta(key)? {
            Some(MetaValue::Kv(kv)) => Ok(Some(kv.value)),
            meta if live_type(meta.as_ref()).is_some() => Err(OrdisError::WrongType),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::temp_store;
    use super::super::version::pending_markers;
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_set_get_overwrite() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.get(b"k").unwrap(), None);
        store.set(b"k", b"one").unwrap();
        store.set(b"k", b"two").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn test_empty_value() {
        let (_dir, mut store) = temp_store();
        store.set(b"k", b"").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(Vec::new()));
        assert!(store.exists(b"k").unwrap());
    }

    #[test]
    fn test_set_over_collection_retires_it() {
        let (_dir, mut store) = temp_store();
        store.hset(b"k", b"f", b"v").unwrap();
        store.set(b"k", b"plain").unwrap();

        assert_eq!(store.key_type(b"k").unwrap(), Some(DataType::Kv));
        assert_eq!(store.get(b"k").unwrap(), Some(b"plain".to_vec()));
        let markers = pending_markers(store.engine(), 10).unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].key, b"k".to_vec());
    }

    #[test]
    fn test_get_on_collection_is_wrong_type() {
        let (_dir, mut store) = temp_store();
        store.rpush(b"l", &[b"a".to_vec()]).unwrap();
        assert!(matches!(store.get(b"l"), Err(OrdisError::WrongType)));
    }
}
