//! Sorted sets.
//!
//! Each member owns two rows in the generation's item range:
//!
//! ```text
//! ItemKey(key, v, member)              -> encoded score (8 bytes)
//! ZScoreItemKey(key, v, score, member) -> empty
//! ```
//!
//! Both shapes share the `'S' | len | key | version` prefix, so they are told
//! apart by value: score rows are always empty, member rows never are. A
//! write that would land on a row of the other shape is rejected.

use super::Store;
use crate::codec::score::is_encodable;
use crate::codec::{
    decode_score, encode_score, item_prefix, prefix_upper_bound, ItemKey, MetaValue,
    ZScoreItemKey,
};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::types::{DataType, Version};

fn check_score(score: f64) -> Result<()> {
    if !is_encodable(score) {
        return Err(OrdisError::InvalidArgument(format!(
            "score {} is not representable",
            score
        )));
    }
    Ok(())
}

fn collision(member: &[u8]) -> OrdisError {
    OrdisError::InvalidArgument(format!(
        "member {:?} collides with an existing score row",
        String::from_utf8_lossy(member)
    ))
}

impl<S: OrderedStore> Store<S> {
    /// Encoded score of `member`, if present in generation `version`.
    fn member_score(&self, key: &[u8], version: Version, member: &[u8]) -> Result<Option<u64>> {
        let Some(raw) = self.engine.get(&ItemKey::new(key, version, member).encode())? else {
            return Ok(None);
        };
        match <[u8; 8]>::try_from(raw.as_slice()) {
            Ok(bytes) => Ok(Some(u64::from_be_bytes(bytes))),
            // a score row whose bytes happen to spell this member
            Err(_) if raw.is_empty() => Ok(None),
            Err(_) => Err(OrdisError::Corruption(format!(
                "sorted set member row holds {} bytes",
                raw.len()
            ))),
        }
    }

    /// Add `member` with `score`, or move it. Returns true if it is new.
    pub fn zadd(&mut self, key: &[u8], member: &[u8], score: f64) -> Result<bool> {
        check_score(score)?;
        let mut meta = self.writable_collection(key, DataType::ZSet)?;
        let version = meta.version;
        let encoded = encode_score(score);

        let member_row = ItemKey::new(key, version, member).encode();
        let score_row = ZScoreItemKey::encode_raw(key, version, encoded, member);
        let previous = match self.engine.get(&member_row)? {
            Some(raw) if raw.is_empty() => return Err(collision(member)),
            Some(_) => self.member_score(key, version, member)?,
            None => None,
        };
        if previous == Some(encoded) {
            return Ok(false);
        }
        if matches!(self.engine.get(&score_row)?, Some(raw) if !raw.is_empty()) {
            return Err(collision(member));
        }

        let mut batch = WriteBatch::new();
        if let Some(old) = previous {
            batch.delete(ZScoreItemKey::encode_raw(key, version, old, member));
        } else {
            meta.length += 1;
        }
        batch.put(member_row, encoded.to_be_bytes().to_vec());
        batch.put(score_row, Vec::new());
        self.stage_meta(&mut batch, key, &MetaValue::Collection(meta));
        self.engine.write(batch)?;
        Ok(previous.is_none())
    }

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<Option<f64>> {
        match self.live_collection(key, DataType::ZSet)? {
            Some(meta) => Ok(self
                .member_score(key, meta.version, member)?
                .map(decode_score)),
            None => Ok(None),
        }
    }

    /// Remove `members`. Returns how many were present.
    pub fn zrem(&mut self, key: &[u8], members: &[Vec<u8>]) -> Result<usize> {
        let Some(mut meta) = self.live_collection(key, DataType::ZSet)? else {
            return Ok(0);
        };
        let mut batch = WriteBatch::new();
        let mut removed = 0;
        let mut seen = std::collections::HashSet::new();
        for member in members {
            if !seen.insert(member.as_slice()) {
                continue;
            }
            if let Some(old) = self.member_score(key, meta.version, member)? {
                batch.delete(ItemKey::new(key, meta.version, member.as_slice()).encode());
                batch.delete(ZScoreItemKey::encode_raw(key, meta.version, old, member));
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

    pub fn zcard(&self, key: &[u8]) -> Result<u64> {
        Ok(self
            .live_collection(key, DataType::ZSet)?
            .map_or(0, |meta| meta.length))
    }

    /// Members with `min <= score <= max`, ascending by score then member,
    /// at most `limit` of them. Infinite bounds are allowed.
    pub fn zrange_by_score(
        &self,
        key: &[u8],
        min: f64,
        max: f64,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, f64)>> {
        if min.is_nan() || max.is_nan() {
            return Err(OrdisError::InvalidArgument("score bound is NaN".into()));
        }
        let Some(meta) = self.live_collection(key, DataType::ZSet)? else {
            return Ok(Vec::new());
        };
        if min > max || limit == 0 {
            return Ok(Vec::new());
        }

        let lower = ZScoreItemKey::score_bound(key, meta.version, encode_score(min));
        let upper = match encode_score(max).checked_add(1) {
            Some(next) => Some(ZScoreItemKey::score_bound(key, meta.version, next)),
            None => prefix_upper_bound(&item_prefix(key, meta.version)),
        };
        self.scan_range(&lower, upper.as_deref(), limit, |_, value| value.is_empty())?
            .into_iter()
            .map(|(raw, _)| {
                let row = ZScoreItemKey::decode(&raw)?;
                Ok((row.field, row.score))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::temp_store;
    use super::*;

    #[test]
    fn test_zadd_and_move() {
        let (_dir, mut store) = temp_store();
        assert!(store.zadd(b"z", b"a", 1.5).unwrap());
        assert!(!store.zadd(b"z", b"a", 1.5).unwrap());
        assert!(!store.zadd(b"z", b"a", -3.0).unwrap());
        assert_eq!(store.zscore(b"z", b"a").unwrap(), Some(-3.0));
        assert_eq!(store.zcard(b"z").unwrap(), 1);

        let all = store
            .zrange_by_score(b"z", f64::NEG_INFINITY, f64::INFINITY, usize::MAX)
            .unwrap();
        assert_eq!(all, vec![(b"a".to_vec(), -3.0)]);
    }

    #[test]
    fn test_range_by_score_order_and_bounds() {
        let (_dir, mut store) = temp_store();
        store.zadd(b"z", b"c", 2.0).unwrap();
        store.zadd(b"z", b"b", 2.0).unwrap();
        store.zadd(b"z", b"neg", -10.25).unwrap();
        store.zadd(b"z", b"big", 1e9).unwrap();

        let members = |min, max, limit| -> Vec<Vec<u8>> {
            store
                .zrange_by_score(b"z", min, max, limit)
                .unwrap()
                .into_iter()
                .map(|(m, _)| m)
                .collect()
        };
        assert_eq!(
            members(f64::NEG_INFINITY, f64::INFINITY, usize::MAX),
            vec![b"neg".to_vec(), b"b".to_vec(), b"c".to_vec(), b"big".to_vec()]
        );
        assert_eq!(members(2.0, 2.0, usize::MAX), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(members(-11.0, 100.0, 2), vec![b"neg".to_vec(), b"b".to_vec()]);
        assert!(members(3.0, 1.0, usize::MAX).is_empty());
    }

    #[test]
    fn test_zrem() {
        let (_dir, mut store) = temp_store();
        store.zadd(b"z", b"a", 1.0).unwrap();
        store.zadd(b"z", b"b", 2.0).unwrap();
        assert_eq!(store.zrem(b"z", &[b"a".to_vec(), b"x".to_vec()]).unwrap(), 1);
        assert_eq!(store.zscore(b"z", b"a").unwrap(), None);
        assert_eq!(
            store.zrange_by_score(b"z", 0.0, 10.0, 10).unwrap(),
            vec![(b"b".to_vec(), 2.0)]
        );
        assert_eq!(store.zrem(b"z", &[b"b".to_vec()]).unwrap(), 1);
        assert!(!store.exists(b"z").unwrap());
    }

    #[test]
    fn test_rejects_unencodable_scores() {
        let (_dir, mut store) = temp_store();
        for score in [f64::NAN, f64::INFINITY, 1e300] {
            assert!(matches!(
                store.zadd(b"z", b"m", score),
                Err(OrdisError::InvalidArgument(_))
            ));
        }
        assert!(!store.exists(b"z").unwrap());
    }

    #[test]
    fn test_member_shaped_like_score_row_is_rejected() {
        let (_dir, mut store) = temp_store();
        store.zadd(b"z", b"m", 1.0).unwrap();
        let mut forged = encode_score(1.0).to_be_bytes().to_vec();
        forged.extend_from_slice(b"m");
        assert!(matches!(
            store.zadd(b"z", &forged, 5.0),
            Err(OrdisError::InvalidArgument(_))
        ));
        assert_eq!(store.zscore(b"z", &forged).unwrap(), None);
        assert_eq!(store.zcard(b"z").unwrap(), 1);
    }
}
