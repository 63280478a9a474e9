//! ORDIS - Engine Metrics & Observability
//! Lock-free counters for operations against the ordered engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic operation counters for the engine.
///
/// All counters use `Ordering::Relaxed`; they are read for reporting only.
#[derive(Debug)]
pub struct EngineMetrics {
    /// Point lookups.
    pub gets: AtomicU64,
    /// Range scans.
    pub scans: AtomicU64,
    /// Write batches committed.
    pub batches: AtomicU64,
    /// Put operations inside committed batches.
    pub puts: AtomicU64,
    /// Delete operations inside committed batches.
    pub deletes: AtomicU64,
    /// Total bytes written (keys + values).
    pub bytes_written: AtomicU64,
    /// Total bytes returned by gets and scans.
    pub bytes_read: AtomicU64,
    /// WAL batches replayed at open.
    pub wal_recoveries: AtomicU64,
    /// Timestamp when the engine was opened.
    engine_started: Instant,
}

impl EngineMetrics {
    /// Create a new metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self {
            gets: AtomicU64::new(0),
            scans: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            wal_recoveries: AtomicU64::new(0),
            engine_started: Instant::now(),
        }
    }

    pub fn record_get(&self, value_size: Option<usize>) {
        self.gets.fetch_add(1, Ordering::Relaxed);
        if let Some(size) = value_size {
            self.bytes_read.fetch_add(size as u64, Ordering::Relaxed);
        }
    }

    pub fn record_scan(&self, bytes: usize) {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_batch(&self, puts: usize, deletes: usize, bytes: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.puts.fetch_add(puts as u64, Ordering::Relaxed);
        self.deletes.fetch_add(deletes as u64, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_recovery(&self, batches: usize) {
        self.wal_recoveries
            .fetch_add(batches as u64, Ordering::Relaxed);
    }

    /// Get engine uptime in seconds.
    pub fn uptime_secs(&self) -> f64 {
        self.engine_started.elapsed().as_secs_f64()
    }

    /// Gets, scans and committed batches.
    pub fn total_ops(&self) -> u64 {
        self.gets.load(Ordering::Relaxed)
            + self.scans.load(Ordering::Relaxed)
            + self.batches.load(Ordering::Relaxed)
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "gets:      {}\n\
             scans:     {}\n\
             batches:   {}\n\
             puts:      {}\n\
             deletes:   {}\n\
             written:   {} bytes\n\
             read:      {} bytes\n\
             recovered: {} batches\n\
             uptime:    {:.2}s",
            self.gets.load(Ordering::Relaxed),
            self.scans.load(Ordering::Relaxed),
            self.batches.load(Ordering::Relaxed),
            self.puts.load(Ordering::Relaxed),
            self.deletes.load(Ordering::Relaxed),
            self.bytes_written.load(Ordering::Relaxed),
            self.bytes_read.load(Ordering::Relaxed),
            self.wal_recoveries.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operations() {
        let m = EngineMetrics::new();

        m.record_get(Some(10));
        m.record_get(None);
        m.record_scan(5);
        m.record_batch(2, 1, 30);

        assert_eq!(m.gets.load(Ordering::Relaxed), 2);
        assert_eq!(m.scans.load(Ordering::Relaxed), 1);
        assert_eq!(m.puts.load(Ordering::Relaxed), 2);
        assert_eq!(m.deletes.load(Ordering::Relaxed), 1);
        assert_eq!(m.bytes_read.load(Ordering::Relaxed), 15);
        assert_eq!(m.bytes_written.load(Ordering::Relaxed), 30);
        assert_eq!(m.total_ops(), 4);
    }

    #[test]
    fn test_report_format() {
        let m = EngineMetrics::default();
        m.record_batch(1, 0, 20);
        let report = m.report();
        assert!(report.contains("batches:"));
        assert!(report.contains("written:"));
    }
}
