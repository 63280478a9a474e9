//! Key families of the flat keyspace.
//!
//! ```text
//! MetaKey        'M' | slot(2) | key(rest)
//! ItemKey        'S' | len(2) | key(len) | version(2) | field(rest)
//! ZScoreItemKey  'S' | len(2) | key(len) | version(2) | score(8) | field(rest)
//! ListItemKey    'S' | len(2) | key(len) | version(2) | seq(8)
//! DeleteKey      'D' | slot(2) | len(2) | key(len) | version(2)
//! ```
//!
//! Every item row of one generation of a collection shares the prefix
//! `'S' | len | key | version`, so a scan bounded by that prefix sees
//! exactly that generation.
//!
//! Encoders of the length-prefixed families panic on a key longer than
//! `u16::MAX` bytes. The store rejects such keys before encoding.

use super::cursor::{Decoder, Encoder};
use super::score::{decode_score, encode_score};
use crate::error::CodecError;
use crate::types::{Slot, Version, DELETE_MASK, ITEM_PREFIX, META_PREFIX};

/// Consume the leading tag byte and check it.
fn expect_tag(dec: &mut Decoder<'_>, expected: u8) -> Result<(), CodecError> {
    let found = dec.read_u8("discriminator")?;
    if found != expected {
        return Err(CodecError::InvalidDiscriminator { expected, found });
    }
    Ok(())
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Returns `None` when no such bound exists (prefix is empty or all `0xFF`),
/// meaning the scan is unbounded above.
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while let Some(last) = bound.pop() {
        if last < 0xFF {
            bound.push(last + 1);
            return Some(bound);
        }
    }
    None
}

/// Metadata record locator for one user key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetaKey {
    pub slot: Slot,
    pub key: Vec<u8>,
}

impl MetaKey {
    pub fn new(slot: Slot, key: impl Into<Vec<u8>>) -> Self {
        Self {
            slot,
            key: key.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(3 + self.key.len());
        enc.put_u8(META_PREFIX).put_u16(self.slot).put_bytes(&self.key);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        expect_tag(&mut dec, META_PREFIX)?;
        let slot = dec.read_u16("slot")?;
        let key = dec.read_remaining().to_vec();
        Ok(Self { slot, key })
    }
}

/// Common `'S' | len | key | version` head of every item key.
fn encode_item_head(enc: &mut Encoder, key: &[u8], version: Version) {
    enc.put_u8(ITEM_PREFIX)
        .put_len16_bytes(key)
        .put_u16(version);
}

fn decode_item_head<'a>(dec: &mut Decoder<'a>) -> Result<(&'a [u8], Version), CodecError> {
    expect_tag(dec, ITEM_PREFIX)?;
    let key = dec.read_len16_bytes("key")?;
    let version = dec.read_u16("version")?;
    Ok((key, version))
}

/// Prefix shared by all item rows of `key` at `version`.
///
/// # Panics
/// If `key` is longer than `u16::MAX` bytes.
pub fn item_prefix(key: &[u8], version: Version) -> Vec<u8> {
    let mut enc = Encoder::with_capacity(5 + key.len());
    encode_item_head(&mut enc, key, version);
    enc.finish()
}

/// Hash field or set member row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub key: Vec<u8>,
    pub version: Version,
    pub field: Vec<u8>,
}

impl ItemKey {
    pub fn new(key: impl Into<Vec<u8>>, version: Version, field: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            version,
            field: field.into(),
        }
    }

    /// # Panics
    /// If `key` is longer than `u16::MAX` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(5 + self.key.len() + self.field.len());
        encode_item_head(&mut enc, &self.key, self.version);
        enc.put_bytes(&self.field);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let (key, version) = decode_item_head(&mut dec)?;
        let field = dec.read_remaining();
        Ok(Self {
            key: key.to_vec(),
            version,
            field: field.to_vec(),
        })
    }
}

/// Sorted-set row ordered by score, then member.
#[derive(Debug, Clone, PartialEq)]
pub struct ZScoreItemKey {
    pub key: Vec<u8>,
    pub version: Version,
    pub score: f64,
    pub field: Vec<u8>,
}

impl ZScoreItemKey {
    pub fn new(
        key: impl Into<Vec<u8>>,
        version: Version,
        score: f64,
        field: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key: key.into(),
            version,
            score,
            field: field.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        Self::encode_raw(&self.key, self.version, encode_score(self.score), &self.field)
    }

    /// Encode from an already transformed score, avoiding a lossy
    /// decode/encode cycle for scores outside the exact `f64` range.
    pub fn encode_raw(key: &[u8], version: Version, encoded_score: u64, field: &[u8]) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(13 + key.len() + field.len());
        encode_item_head(&mut enc, key, version);
        enc.put_u64(encoded_score).put_bytes(field);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let (key, version) = decode_item_head(&mut dec)?;
        let score = decode_score(dec.read_u64("score")?);
        let field = dec.read_remaining();
        Ok(Self {
            key: key.to_vec(),
            version,
            score,
            field: field.to_vec(),
        })
    }

    /// Lowest possible key for rows with encoded score `>= encoded_score`.
    pub fn score_bound(key: &[u8], version: Version, encoded_score: u64) -> Vec<u8> {
        Self::encode_raw(key, version, encoded_score, &[])
    }
}

/// List slot row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListItemKey {
    pub key: Vec<u8>,
    pub version: Version,
    pub seq: u64,
}

impl ListItemKey {
    pub fn new(key: impl Into<Vec<u8>>, version: Version, seq: u64) -> Self {
        Self {
            key: key.into(),
            version,
            seq,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(13 + self.key.len());
        encode_item_head(&mut enc, &self.key, self.version);
        enc.put_u64(self.seq);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let (key, version) = decode_item_head(&mut dec)?;
        let seq = dec.read_u64("seq")?;
        Ok(Self {
            key: key.to_vec(),
            version,
            seq,
        })
    }
}

/// Queued instruction to erase the item rows of one retired generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeleteKey {
    pub slot: Slot,
    pub key: Vec<u8>,
    pub version: Version,
}

impl DeleteKey {
    pub fn new(slot: Slot, key: impl Into<Vec<u8>>, version: Version) -> Self {
        Self {
            slot,
            key: key.into(),
            version,
        }
    }

    /// # Panics
    /// If `key` is longer than `u16::MAX` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(7 + self.key.len());
        enc.put_u8(DELETE_MASK)
            .put_u16(self.slot)
            .put_len16_bytes(&self.key)
            .put_u16(self.version);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        expect_tag(&mut dec, DELETE_MASK)?;
        let slot = dec.read_u16("slot")?;
        let key = dec.read_len16_bytes("key")?.to_vec();
        let version = dec.read_u16("version")?;
        Ok(Self { slot, key, version })
    }

    /// Prefix of every pending marker for `(slot, key)`.
    pub fn key_prefix(slot: Slot, key: &[u8]) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(5 + key.len());
        enc.put_u8(DELETE_MASK).put_u16(slot).put_len16_bytes(key);
        enc.finish()
    }

    /// Prefix of the whole marker queue.
    pub fn queue_prefix() -> Vec<u8> {
        vec![DELETE_MASK]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_key_example() {
        let key = MetaKey::new(7, b"user:42".to_vec());
        let encoded = key.encode();
        let mut expected = vec![0x4D, 0x00, 0x07];
        expected.extend_from_slice(b"user:42");
        assert_eq!(encoded, expected);
        assert_eq!(MetaKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_meta_key_wrong_tag() {
        let mut encoded = MetaKey::new(1, b"k".to_vec()).encode();
        encoded[0] = b'S';
        assert_eq!(
            MetaKey::decode(&encoded),
            Err(CodecError::InvalidDiscriminator {
                expected: b'M',
                found: b'S'
            })
        );
    }

    #[test]
    fn test_empty_buffer_is_truncated() {
        assert!(matches!(
            MetaKey::decode(&[]),
            Err(CodecError::Truncated { .. })
        ));
        assert!(matches!(
            DeleteKey::decode(&[]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_item_key_layout() {
        let key = ItemKey::new(b"h".to_vec(), 0x0102, b"f".to_vec());
        assert_eq!(key.encode(), vec![b'S', 0, 1, b'h', 0x01, 0x02, b'f']);
        assert_eq!(ItemKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_overlong_key_refused_by_encoder() {
        let key = vec![b'k'; u16::MAX as usize + 1];
        ItemKey::new(key, 0, b"f".to_vec()).encode();
    }

    #[test]
    fn test_item_key_empty_parts() {
        let key = ItemKey::new(Vec::new(), 0, Vec::new());
        assert_eq!(ItemKey::decode(&key.encode()).unwrap(), key);
    }

    #[test]
    fn test_zscore_key_orders_by_score() {
        let low = ZScoreItemKey::new(b"z".to_vec(), 3, -2.5, b"zzz".to_vec()).encode();
        let high = ZScoreItemKey::new(b"z".to_vec(), 3, 1.0, b"aaa".to_vec()).encode();
        assert!(low < high);

        let decoded = ZScoreItemKey::decode(&high).unwrap();
        assert_eq!(decoded.score, 1.0);
        assert_eq!(decoded.field, b"aaa");
    }

    #[test]
    fn test_list_key_orders_by_seq() {
        let a = ListItemKey::new(b"l".to_vec(), 1, 10).encode();
        let b = ListItemKey::new(b"l".to_vec(), 1, 11).encode();
        assert!(a < b);
        assert_eq!(ListItemKey::decode(&b).unwrap().seq, 11);
    }

    #[test]
    fn test_list_key_missing_seq() {
        let encoded = ListItemKey::new(b"l".to_vec(), 1, 10).encode();
        assert_eq!(
            ListItemKey::decode(&encoded[..encoded.len() - 1]),
            Err(CodecError::Truncated { field: "seq" })
        );
    }

    #[test]
    fn test_delete_key_round_trip() {
        let key = DeleteKey::new(513, b"big-hash".to_vec(), 9);
        let encoded = key.encode();
        assert_eq!(encoded[0], DELETE_MASK);
        assert!(encoded.starts_with(&DeleteKey::key_prefix(513, b"big-hash")));
        assert_eq!(DeleteKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn test_item_prefix_bounds_generation() {
        let prefix = item_prefix(b"k", 4);
        let upper = prefix_upper_bound(&prefix).unwrap();
        let live = ItemKey::new(b"k".to_vec(), 4, vec![0xFF, 0xFF]).encode();
        let next = ItemKey::new(b"k".to_vec(), 5, Vec::new()).encode();
        assert!(live >= prefix && live < upper);
        assert!(next >= upper);
    }

    #[test]
    fn test_prefix_upper_bound() {
        assert_eq!(prefix_upper_bound(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_upper_bound(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_upper_bound(&[0xFF, 0xFF]), None);
        assert_eq!(prefix_upper_bound(&[]), None);
    }
}
