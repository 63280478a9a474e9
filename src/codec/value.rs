//! Meta records stored under a [`MetaKey`](super::MetaKey).
//!
//! ```text
//! KvMetaVal    'k' | value(rest)
//! MetaVal      'h'|'s'|'z' | version(2) | reserved(1) | flag(1) | length(8)
//! ListMetaVal  'l' | version(2) | reserved(1) | flag(1) | length(8) | left(8) | right(8)
//! ```
//!
//! The reserved byte is written as zero and ignored on read.

use super::cursor::{Decoder, Encoder};
use crate::error::CodecError;
use crate::types::{DataType, DeletionFlag, Version};

const RESERVED: u8 = 0;

/// Size of an encoded [`MetaVal`].
pub const META_VAL_LEN: usize = 13;

/// Size of an encoded [`ListMetaVal`].
pub const LIST_META_VAL_LEN: usize = 29;

fn read_type(dec: &mut Decoder<'_>) -> Result<u8, CodecError> {
    dec.read_u8("type")
}

/// Plain string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvMetaVal {
    pub value: Vec<u8>,
}

impl KvMetaVal {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(1 + self.value.len());
        enc.put_u8(DataType::Kv as u8).put_bytes(&self.value);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let found = read_type(&mut dec)?;
        if found != DataType::Kv as u8 {
            return Err(CodecError::InvalidDiscriminator {
                expected: DataType::Kv as u8,
                found,
            });
        }
        Ok(Self {
            value: dec.read_remaining().to_vec(),
        })
    }
}

/// Size record of a hash, set or sorted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaVal {
    pub data_type: DataType,
    pub version: Version,
    pub flag: DeletionFlag,
    pub length: u64,
}

impl MetaVal {
    /// A live, empty record of `data_type` at `version`.
    pub fn new(data_type: DataType, version: Version) -> Self {
        debug_assert!(matches!(
            data_type,
            DataType::Hash | DataType::Set | DataType::ZSet
        ));
        Self {
            data_type,
            version,
            flag: DeletionFlag::Enabled,
            length: 0,
        }
    }

    pub fn is_live(&self) -> bool {
        self.flag == DeletionFlag::Enabled
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(META_VAL_LEN);
        enc.put_u8(self.data_type as u8)
            .put_u16(self.version)
            .put_u8(RESERVED)
            .put_u8(self.flag as u8)
            .put_u64(self.length);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let found = read_type(&mut dec)?;
        let data_type = match found {
            b'h' => DataType::Hash,
            b's' => DataType::Set,
            b'z' => DataType::ZSet,
            // any other tag, list and plain value included, is outside this shape
            _ => {
                return Err(CodecError::InvalidEnumValue {
                    field: "type",
                    value: found,
                })
            }
        };
        Self::decode_body(data_type, &mut dec)
    }

    fn decode_body(data_type: DataType, dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let version = dec.read_u16("version")?;
        dec.skip(1, "reserved")?;
        let flag = DeletionFlag::try_from(dec.read_u8("deletion flag")?)?;
        let length = dec.read_u64("length")?;
        Ok(Self {
            data_type,
            version,
            flag,
            length,
        })
    }
}

/// Size record of a list plus its live sequence window `[left, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMetaVal {
    pub version: Version,
    pub flag: DeletionFlag,
    pub length: u64,
    pub left: u64,
    pub right: u64,
}

impl ListMetaVal {
    /// A live list holding one element at `seq`.
    pub fn new(version: Version, seq: u64) -> Self {
        Self {
            version,
            flag: DeletionFlag::Enabled,
            length: 1,
            left: seq,
            right: seq,
        }
    }

    pub fn is_live(&self) -> bool {
        self.flag == DeletionFlag::Enabled
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(LIST_META_VAL_LEN);
        enc.put_u8(DataType::List as u8)
            .put_u16(self.version)
            .put_u8(RESERVED)
            .put_u8(self.flag as u8)
            .put_u64(self.length)
            .put_u64(self.left)
            .put_u64(self.right);
        enc.finish()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let found = read_type(&mut dec)?;
        if found != DataType::List as u8 {
            return Err(CodecError::InvalidDiscriminator {
                expected: DataType::List as u8,
                found,
            });
        }
        Self::decode_body(&mut dec)
    }

    fn decode_body(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let version = dec.read_u16("version")?;
        dec.skip(1, "reserved")?;
        let flag = DeletionFlag::try_from(dec.read_u8("deletion flag")?)?;
        let length = dec.read_u64("length")?;
        let left = dec.read_u64("left")?;
        let right = dec.read_u64("right")?;
        let meta = Self {
            version,
            flag,
            length,
            left,
            right,
        };
        meta.validate()?;
        Ok(meta)
    }

    /// A live, non-empty list must satisfy `right - left + 1 == length`.
    fn validate(&self) -> Result<(), CodecError> {
        if !self.is_live() || self.length == 0 {
            return Ok(());
        }
        if self.left > self.right {
            return Err(CodecError::Corruption(format!(
                "list window left {} > right {}",
                self.left, self.right
            )));
        }
        let span = self.right - self.left;
        if span.checked_add(1) != Some(self.length) {
            return Err(CodecError::Corruption(format!(
                "list length {} disagrees with window [{}, {}]",
                self.length, self.left, self.right
            )));
        }
        Ok(())
    }
}

/// Any meta record, dispatched on its leading type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Kv(KvMetaVal),
    Collection(MetaVal),
    List(ListMetaVal),
}

impl MetaValue {
    pub fn data_type(&self) -> DataType {
        match self {
            MetaValue::Kv(_) => DataType::Kv,
            MetaValue::Collection(meta) => meta.data_type,
            MetaValue::List(_) => DataType::List,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            MetaValue::Kv(v) => v.encode(),
            MetaValue::Collection(v) => v.encode(),
            MetaValue::List(v) => v.encode(),
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let Some(&tag) = bytes.first() else {
            return Err(CodecError::Truncated { field: "type" });
        };
        let data_type = DataType::try_from(tag)?;
        match data_type {
            DataType::Kv => KvMetaVal::decode(bytes).map(MetaValue::Kv),
            DataType::Hash | DataType::Set | DataType::ZSet => {
                MetaVal::decode(bytes).map(MetaValue::Collection)
            }
            DataType::List => ListMetaVal::decode(bytes).map(MetaValue::List),
        }
    }
}

impl From<KvMetaVal> for MetaValue {
    fn from(v: KvMetaVal) -> Self {
        MetaValue::Kv(v)
    }
}

impl From<MetaVal> for MetaValue {
    fn from(v: MetaVal) -> Self {
        MetaValue::Collection(v)
    }
}

impl From<ListMetaVal> for MetaValue {
    fn from(v: ListMetaVal) -> Self {
        MetaValue::List(v)
    }
}
