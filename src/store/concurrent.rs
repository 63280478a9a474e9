//! ORDIS - Shared Store Wrapper
//! Thread-safe handle around a [`Store`] using Arc + RwLock.
//!
//! ## Concurrency Model
//! - **Reads** (`get`, `hget`, `smembers`, ...) take a **read lock** (shared)
//! - **Writes** (`set`, `hset`, `del`, sweeper chunks, ...) take a **write lock**
//!   (exclusive), so each write's read-modify-write of a meta record is atomic
//! - A panicked lock holder surfaces as [`OrdisError::LockPoisoned`]

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::engine::metrics::EngineMetrics;
use crate::engine::Engine;
use crate::error::{OrdisError, Result};
use crate::types::Value;

use super::Store;

/// Cloneable, thread-safe handle to one disk-backed store.
///
/// ## Example
/// ```no_run
/// use ordis::config::Config;
/// use ordis::store::SharedStore;
/// use std::thread;
///
/// let store = SharedStore::open(Config::new("./ordis_data")).unwrap();
/// let writer = store.clone();
/// thread::spawn(move || {
///     writer.hset(b"user:1", b"name", b"ada").unwrap();
/// })
/// .join()
/// .unwrap();
/// assert_eq!(store.hget(b"user:1", b"name").unwrap(), Some(b"ada".to_vec()));
/// ```
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<Store<Engine>>>,
}

impl SharedStore {
    pub fn open(config: Config) -> Result<Self> {
        Ok(Self::new(Store::open(config)?))
    }

    pub fn new(store: Store<Engine>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, Store<Engine>>> {
        self.inner.read().map_err(|_| OrdisError::LockPoisoned)
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, Store<Engine>>> {
        self.inner.write().map_err(|_| OrdisError::LockPoisoned)
    }

    /// Run `f` under the read lock.
    pub fn read<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Store<Engine>) -> Result<R>,
    {
        let guard = self.read_guard()?;
        f(&guard)
    }

    /// Run `f` under the write lock.
    pub fn write<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Store<Engine>) -> Result<R>,
    {
        let mut guard = self.write_guard()?;
        f(&mut guard)
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(|store| store.set(key, value))
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        self.read(|store| store.get(key))
    }

    pub fn del(&self, key: &[u8]) -> Result<bool> {
        self.write(|store| store.del(key))
    }

    pub fn hset(&self, key: &[u8], field: &[u8], value: &[u8]) -> Result<bool> {
        self.write(|store| store.hset(key, field, value))
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Value>> {
        self.read(|store| store.hget(key, field))
    }

    pub fn sadd(&self, key: &[u8], members: &[Vec<u8>]) -> Result<usize> {
        self.write(|store| store.sadd(key, members))
    }

    pub fn rpush(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.write(|store| store.rpush(key, values))
    }

    /// Inspect engine metrics under the read lock.
    pub fn with_metrics<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&EngineMetrics) -> R,
    {
        let store = self.read_guard()?;
        Ok(f(store.engine().metrics()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn temp_shared() -> (tempfile::TempDir, SharedStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedStore::open(Config::new(dir.path())).unwrap();
        (dir, store)
    }

    #[test]
    fn test_clone_and_share() {
        let (_dir, store) = temp_shared();
        let clone = store.clone();
        clone.set(b"shared", b"data").unwrap();
        assert_eq!(store.get(b"shared").unwrap(), Some(b"data".to_vec()));
    }

    #[test]
    fn test_concurrent_hash_writers() {
        let (_dir, store) = temp_shared();
        let mut handles = vec![];

        for i in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for j in 0..25 {
                    let field = format!("f{}_{}", i, j);
                    store.hset(b"h", field.as_bytes(), b"v").unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // every increment of the length landed
        assert_eq!(store.read(|s| s.hlen(b"h")).unwrap(), 200);
    }

    #[test]
    fn test_concurrent_push_and_read() {
        let (_dir, store) = temp_shared();
        store.rpush(b"l", &[b"seed".to_vec()]).unwrap();
        let mut handles = vec![];

        for i in 0..4 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                store.rpush(b"l", &[format!("w{}", i).into_bytes()]).unwrap();
            }));
        }
        for _ in 0..4 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let items = store.read(|s| s.lrange(b"l", 0, -1)).unwrap();
                assert!(!items.is_empty());
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read(|s| s.llen(b"l")).unwrap(), 5);
    }

    #[test]
    fn test_poisoned_lock_reported() {
        let (_dir, store) = temp_shared();
        let clone = store.clone();
        let _ = thread::spawn(move || {
            clone
                .write(|_| -> Result<()> { panic!("writer died") })
                .unwrap();
        })
        .join();

        assert!(matches!(store.get(b"k"), Err(OrdisError::LockPoisoned)));
    }

    #[test]
    fn test_metrics_access() {
        let (_dir, store) = temp_shared();
        let batches = |store: &SharedStore| {
            store
                .with_metrics(|m| m.batches.load(std::sync::atomic::Ordering::Relaxed))
                .unwrap()
        };
        let before = batches(&store);
        store.set(b"k", b"v").unwrap();
        assert_eq!(batches(&store), before + 1);
    }
}
