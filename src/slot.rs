//! ORDIS - Slot Derivation
//! Maps a user key to the partition its meta record and delete markers
//! live in.
//!
//! A key containing a non-empty `{tag}` section is hashed on the tag only,
//! so `{user:42}.profile` and `{user:42}.sessions` share a slot.

use crate::types::Slot;

/// Default number of slots.
pub const DEFAULT_SLOT_COUNT: u16 = 16384;

/// Bytes of `key` that select its slot.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    if let Some(open) = key.iter().position(|&b| b == b'{') {
        let rest = &key[open + 1..];
        if let Some(close) = rest.iter().position(|&b| b == b'}') {
            if close > 0 {
                return &rest[..close];
            }
        }
    }
    key
}

/// Slot of `key` among `slot_count` partitions.
pub fn slot_for(key: &[u8], slot_count: u16) -> Slot {
    let count = u32::from(slot_count.max(1));
    (crc32fast::hash(hash_tag(key)) % count) as Slot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_tag() {
        assert_eq!(hash_tag(b"{user:42}.profile"), b"user:42");
        assert_eq!(hash_tag(b"plain"), b"plain");
        assert_eq!(hash_tag(b"empty{}tag"), b"empty{}tag");
        assert_eq!(hash_tag(b"open{only"), b"open{only");
    }

    #[test]
    fn test_tagged_keys_share_slot() {
        let a = slot_for(b"{user:42}.profile", DEFAULT_SLOT_COUNT);
        let b = slot_for(b"{user:42}.sessions", DEFAULT_SLOT_COUNT);
        assert_eq!(a, b);
    }

    #[test]
    fn test_slot_in_range() {
        for i in 0..200 {
            let key = format!("key:{}", i);
            assert!(slot_for(key.as_bytes(), 16) < 16);
        }
        assert_eq!(slot_for(b"anything", 1), 0);
    }
}
