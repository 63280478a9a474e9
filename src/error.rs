//! ORDIS - Error Types
//! Decode failures of the binary codec and the crate-wide error hierarchy.

use thiserror::Error;

/// Custom Result type for the storage layer.
pub type Result<T> = std::result::Result<T, OrdisError>;

/// Failures reported by the key/value codec.
///
/// A decode that returns one of these has produced no output; callers
/// never see a half-populated record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before `field` could be read.
    #[error("truncated record: missing {field}")]
    Truncated { field: &'static str },

    /// The leading tag byte is not the one this decoder accepts.
    #[error("invalid discriminator: expected {expected:#04x}, found {found:#04x}")]
    InvalidDiscriminator { expected: u8, found: u8 },

    /// A tag or flag byte outside its allowed set.
    #[error("invalid {field} value {value:#04x}")]
    InvalidEnumValue { field: &'static str, value: u8 },

    /// Well-formed bytes describing an impossible record.
    #[error("corrupted record: {0}")]
    Corruption(String),
}

/// Error types for the ordis store.
#[derive(Error, Debug)]
pub enum OrdisError {
    /// I/O errors from file operations (WAL).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored key or value failed to decode.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (CRC mismatch).
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// WAL recovery failure.
    #[error("WAL recovery failed: {0}")]
    RecoveryFailed(String),

    /// Operation against a key holding a different data type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Rejected client input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A lock holder panicked.
    #[error("lock poisoned")]
    LockPoisoned,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for OrdisError {
    fn from(err: bincode::Error) -> Self {
        OrdisError::Serialization(err.to_string())
    }
}
