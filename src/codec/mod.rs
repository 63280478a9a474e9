//! ORDIS - Binary Codec
//! Maps hashes, sets, sorted sets, lists and plain values onto one flat,
//! lexicographically ordered keyspace.
//!
//! Layouts are bit-exact and big-endian throughout; see [`key`] and
//! [`value`] for the record diagrams. Every codec type is a plain value:
//! encoding and decoding never touch shared state.

pub mod cursor;
pub mod key;
pub mod score;
pub mod value;

pub use self::cursor::{Decoder, Encoder};
pub use self::key::{
    item_prefix, prefix_upper_bound, DeleteKey, ItemKey, ListItemKey, MetaKey, ZScoreItemKey,
};
pub use self::score::{decode_score, encode_score, SCORE_SHIFT};
pub use self::value::{KvMetaVal, ListMetaVal, MetaVal, MetaValue};
