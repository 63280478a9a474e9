//! ORDIS - Core Type Definitions
//! Byte-string aliases, tag constants and the small enums shared by the
//! codec and the storage layer.

use crate::error::CodecError;

/// Raw key bytes as seen by the ordered engine.
pub type Key = Vec<u8>;

/// Raw value bytes as seen by the ordered engine.
pub type Value = Vec<u8>;

/// Partition identifier derived from a user key.
pub type Slot = u16;

/// Generation counter of a collection.
pub type Version = u16;

/// Discriminator of every meta key.
pub const META_PREFIX: u8 = b'M';

/// Discriminator shared by all item key variants.
pub const ITEM_PREFIX: u8 = b'S';

/// Discriminator of delete markers, and the "deleted" flag value.
pub const DELETE_MASK: u8 = b'D';

/// Flag value of a live collection.
pub const ENABLED_MASK: u8 = b'E';

/// Data type tag stored as the first byte of every meta value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Kv = b'k',
    Hash = b'h',
    Set = b's',
    ZSet = b'z',
    List = b'l',
}

impl DataType {
    /// Name reported by the TYPE command.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Kv => "string",
            DataType::Hash => "hash",
            DataType::Set => "set",
            DataType::ZSet => "zset",
            DataType::List => "list",
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            b'k' => Ok(DataType::Kv),
            b'h' => Ok(DataType::Hash),
            b's' => Ok(DataType::Set),
            b'z' => Ok(DataType::ZSet),
            b'l' => Ok(DataType::List),
            other => Err(CodecError::InvalidEnumValue {
                field: "type",
                value: other,
            }),
        }
    }
}

/// Liveness flag of a collection's meta record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeletionFlag {
    Enabled = ENABLED_MASK,
    Deleted = DELETE_MASK,
}

impl TryFrom<u8> for DeletionFlag {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            ENABLED_MASK => Ok(DeletionFlag::Enabled),
            DELETE_MASK => Ok(DeletionFlag::Deleted),
            other => Err(CodecError::InvalidEnumValue {
                field: "deletion flag",
                value: other,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_tags() {
        for ty in [
            DataType::Kv,
            DataType::Hash,
            DataType::Set,
            DataType::ZSet,
            DataType::List,
        ] {
            assert_eq!(DataType::try_from(ty as u8).unwrap(), ty);
        }
        assert!(matches!(
            DataType::try_from(b'x'),
            Err(CodecError::InvalidEnumValue { value: b'x', .. })
        ));
    }

    #[test]
    fn test_deletion_flag() {
        assert_eq!(DeletionFlag::try_from(b'E').unwrap(), DeletionFlag::Enabled);
        assert_eq!(DeletionFlag::try_from(b'D').unwrap(), DeletionFlag::Deleted);
        assert!(DeletionFlag::try_from(0).is_err());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(DataType::ZSet.name(), "zset");
    }
}
