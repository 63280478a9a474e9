//! ORDIS - Ordered Storage Engine
//! The byte-ordered key-value layer every data type is encoded onto:
//! point reads, half-open range scans and atomic write batches.

pub mod batch;
pub mod memtable;
pub mod metrics;
pub mod wal;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Key, Value};

pub use self::batch::{BatchOp, WriteBatch};
use self::memtable::MemTable;
use self::metrics::EngineMetrics;
use self::wal::WriteAheadLog;

/// Operations the storage layer needs from an ordered byte-string store.
pub trait OrderedStore {
    /// Point lookup.
    fn get(&self, key: &[u8]) -> Result<Option<Value>>;

    /// Up to `limit` entries with `lower <= key < upper`, ascending.
    /// `upper == None` leaves the range open above.
    fn scan(&self, lower: &[u8], upper: Option<&[u8]>, limit: usize)
        -> Result<Vec<(Key, Value)>>;

    /// Apply every operation of `batch` or none of them.
    fn write(&mut self, batch: WriteBatch) -> Result<()>;

    fn put(&mut self, key: Key, value: Value) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }

    fn delete(&mut self, key: Key) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(key);
        self.write(batch)
    }
}

/// Disk-backed ordered engine: a sorted MemTable made durable by a WAL.
pub struct Engine {
    /// Sorted view of every live row.
    memtable: MemTable,
    /// Write-ahead log for crash recovery.
    wal: WriteAheadLog,
    /// Operation counters.
    metrics: EngineMetrics,
    /// Engine configuration.
    config: Config,
}

impl Engine {
    /// Open or create an engine at the configured path.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        config.ensure_dirs()?;

        let wal_path = config.data_dir.join("ordis.wal");
        let (memtable, batches) = WriteAheadLog::recover(&wal_path)?;
        let wal = WriteAheadLog::open(wal_path, config.sync_writes)?;
        let metrics = EngineMetrics::new();
        metrics.record_recovery(batches);

        log::info!(
            "ordis engine opened at {:?} ({} batches replayed, {} rows)",
            config.data_dir,
            batches,
            memtable.len()
        );

        Ok(Self {
            memtable,
            wal,
            metrics,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memtable.is_empty()
    }

    /// Approximate bytes of keys and values held.
    pub fn size_bytes(&self) -> usize {
        self.memtable.size()
    }

    /// Rewrite the WAL as a compact snapshot of the current rows.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.wal.checkpoint(&self.memtable)?;
        log::info!("WAL checkpointed ({} rows)", self.memtable.len());
        Ok(())
    }
}

impl OrderedStore for Engine {
    fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        let value = self.memtable.get(key).cloned();
        self.metrics.record_get(value.as_ref().map(Vec::len));
        Ok(value)
    }

    fn scan(
        &self,
        lower: &[u8],
        upper: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Key, Value)>> {
        let rows: Vec<(Key, Value)> = self
            .memtable
            .range(lower, upper)
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let bytes = rows.iter().map(|(k, v)| k.len() + v.len()).sum();
        self.metrics.record_scan(bytes);
        Ok(rows)
    }

    /// The write path: WAL (disk) -> MemTable (memory). A crash after the
    /// WAL append replays the whole batch on the next open.
    fn write(&mut self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.wal.append(&batch)?;

        let mut puts = 0;
        let mut bytes = 0;
        let total = batch.len();
        for op in batch.into_ops() {
            if let BatchOp::Put { key, value } = &op {
                puts += 1;
                bytes += key.len() + value.len();
            }
            self.memtable.apply(op);
        }
        self.metrics.record_batch(puts, total - puts, bytes);
        Ok(())
    }
}
