//! ORDIS - Redis-Compatible Structured Store
//!
//! Strings, hashes, sets, sorted sets and lists laid out as binary rows in a
//! single byte-ordered key-value engine.
//!
//! ## Features
//! - **Key Codec**: order-preserving binary layouts for meta, item and marker rows
//! - **Score Transform**: fixed-point `f64` scores that sort correctly as bytes
//! - **Versioned Deletes**: O(1) collection deletes via generation versions
//! - **Sweeper**: background erasure of retired generations
//! - **Engine**: sorted MemTable made crash-safe by a CRC-checked WAL
//! - **Concurrency**: Arc + RwLock shared handle
//!
//! ## Example
//! ```no_run
//! use ordis::{config::Config, store::Store};
//!
//! let mut store = Store::open(Config::new("./ordis_data")).unwrap();
//!
//! store.hset(b"user:42", b"name", b"ada").unwrap();
//! assert_eq!(store.hget(b"user:42", b"name").unwrap(), Some(b"ada".to_vec()));
//!
//! store.del(b"user:42").unwrap();
//! assert!(!store.exists(b"user:42").unwrap());
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod slot;
pub mod store;
pub mod sweeper;
pub mod types;
