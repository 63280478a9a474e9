//! ORDIS - Deferred Row Sweeper
//! Consumes queued [`DeleteKey`] markers and erases the item rows of the
//! generations they name.
//!
//! A marker is stale when the key's meta record is live at the marker's
//! version; such markers are dropped without touching any row. Sweeping is
//! idempotent, so a crash between chunk batches only repeats work.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::{item_prefix, prefix_upper_bound, DeleteKey, MetaKey, MetaValue};
use crate::config::Config;
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::store::version::{pending_markers_after, VersionState};
use crate::store::{SharedStore, Store};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Markers consumed, stale ones included.
    pub markers: usize,
    /// Markers dropped because their generation is live again.
    pub stale: usize,
    /// Item rows erased.
    pub rows: usize,
    /// Markers left queued because sweeping them failed.
    pub failed: usize,
}

impl SweepStats {
    fn absorb(&mut self, other: SweepStats) {
        self.markers += other.markers;
        self.stale += other.stale;
        self.rows += other.rows;
        self.failed += other.failed;
    }
}

/// Result of one locked step on a marker.
enum Chunk {
    /// The marker named the live generation and was dropped.
    Stale,
    Rows { erased: usize, done: bool },
}

/// What a pass runs against: a store borrowed for the whole pass, or a
/// shared store locked once per step.
trait SweepTarget {
    fn markers_after(&mut self, after: Option<&DeleteKey>, limit: usize) -> Result<Vec<DeleteKey>>;

    fn sweep_chunk(&mut self, marker: &DeleteKey, rows_per_batch: usize) -> Result<Chunk>;
}

impl<S: OrderedStore> SweepTarget for Store<S> {
    fn markers_after(&mut self, after: Option<&DeleteKey>, limit: usize) -> Result<Vec<DeleteKey>> {
        pending_markers_after(self.engine(), after, limit)
    }

    fn sweep_chunk(&mut self, marker: &DeleteKey, rows_per_batch: usize) -> Result<Chunk> {
        sweep_chunk(self.engine_mut(), marker, rows_per_batch)
    }
}

impl SweepTarget for SharedStore {
    fn markers_after(&mut self, after: Option<&DeleteKey>, limit: usize) -> Result<Vec<DeleteKey>> {
        self.read(|store| pending_markers_after(store.engine(), after, limit))
    }

    fn sweep_chunk(&mut self, marker: &DeleteKey, rows_per_batch: usize) -> Result<Chunk> {
        self.write(|store| sweep_chunk(store.engine_mut(), marker, rows_per_batch))
    }
}

/// Erase up to `rows_per_batch` rows of the generation `marker` names,
/// deleting the marker with the last of them.
fn sweep_chunk<S: OrderedStore>(
    engine: &mut S,
    marker: &DeleteKey,
    rows_per_batch: usize,
) -> Result<Chunk> {
    let meta_key = MetaKey::new(marker.slot, marker.key.clone()).encode();
    let meta = match engine.get(&meta_key)? {
        Some(raw) => Some(MetaValue::decode(&raw)?),
        None => None,
    };
    if let VersionState::Live { version, .. } = VersionState::of(meta.as_ref()) {
        if version == marker.version {
            log::warn!(
                "dropping stale delete marker for {:?} version {}",
                String::from_utf8_lossy(&marker.key),
                marker.version
            );
            engine.delete(marker.encode())?;
            return Ok(Chunk::Stale);
        }
    }

    let prefix = item_prefix(&marker.key, marker.version);
    let upper = prefix_upper_bound(&prefix);
    let rows = engine.scan(&prefix, upper.as_deref(), rows_per_batch)?;
    let erased = rows.len();
    let done = erased < rows_per_batch;
    let mut batch = WriteBatch::new();
    for (key, _) in rows {
        batch.delete(key);
    }
    if done {
        batch.delete(marker.encode());
    }
    engine.write(batch)?;
    Ok(Chunk::Rows { erased, done })
}

/// Marker consumer.
#[derive(Debug, Clone, Copy)]
pub struct Sweeper {
    /// Markers handled per pass.
    batch_size: usize,
    /// Row deletes per write batch.
    rows_per_batch: usize,
}

impl Sweeper {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            rows_per_batch: 1024,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sweep_batch_size)
    }

    pub fn with_rows_per_batch(mut self, rows: usize) -> Self {
        self.rows_per_batch = rows.max(1);
        self
    }

    /// Handle up to `batch_size` markers in key order.
    ///
    /// A marker that fails (say its meta record no longer decodes) is logged,
    /// counted in [`SweepStats::failed`] and left queued; the pass moves on
    /// to the markers behind it.
    pub fn sweep_once<S: OrderedStore>(&self, store: &mut Store<S>) -> Result<SweepStats> {
        self.run_pass(store)
    }

    /// Like [`Sweeper::sweep_once`], but the write lock is held for one
    /// chunk of `rows_per_batch` rows at a time rather than for the pass.
    pub fn sweep_shared(&self, shared: &SharedStore) -> Result<SweepStats> {
        self.run_pass(&mut shared.clone())
    }

    fn run_pass<T: SweepTarget>(&self, target: &mut T) -> Result<SweepStats> {
        let mut stats = SweepStats::default();
        let mut cursor: Option<DeleteKey> = None;
        let mut handled = 0;
        while handled < self.batch_size {
            let markers = target.markers_after(cursor.as_ref(), self.batch_size - handled)?;
            if markers.is_empty() {
                break;
            }
            for marker in markers {
                match self.sweep_marker(target, &marker) {
                    Ok(marker_stats) => {
                        stats.absorb(marker_stats);
                        handled += 1;
                    }
                    Err(OrdisError::LockPoisoned) => return Err(OrdisError::LockPoisoned),
                    Err(err) => {
                        log::error!(
                            "cannot sweep {:?} version {}: {}",
                            String::from_utf8_lossy(&marker.key),
                            marker.version,
                            err
                        );
                        stats.failed += 1;
                    }
                }
                cursor = Some(marker);
            }
        }
        if stats.markers > 0 || stats.failed > 0 {
            log::info!(
                "sweep pass: {} markers ({} stale, {} failed), {} rows erased",
                stats.markers,
                stats.stale,
                stats.failed,
                stats.rows
            );
        }
        Ok(stats)
    }

    fn sweep_marker<T: SweepTarget>(&self, target: &mut T, marker: &DeleteKey) -> Result<SweepStats> {
        let mut stats = SweepStats {
            markers: 1,
            ..SweepStats::default()
        };
        loop {
            match target.sweep_chunk(marker, self.rows_per_batch)? {
                Chunk::Stale => {
                    stats.stale = 1;
                    return Ok(stats);
                }
                Chunk::Rows { erased, done } => {
                    stats.rows += erased;
                    if done {
                        break;
                    }
                }
            }
        }
        log::debug!(
            "swept {:?} version {} ({} rows)",
            String::from_utf8_lossy(&marker.key),
            marker.version,
            stats.rows
        );
        Ok(stats)
    }

    /// Run a pass every `interval` on a background thread.
    pub fn spawn(self, shared: SharedStore, interval: Duration) -> Result<SweeperHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("ordis-sweeper".into())
            .spawn(move || loop {
                if let Err(err) = self.sweep_shared(&shared) {
                    log::error!("sweep pass failed: {}", err);
                    if matches!(err, OrdisError::LockPoisoned) {
                        break;
                    }
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        log::info!("sweeper started (interval {:?})", interval);
        Ok(SweeperHandle {
            stop: stop_tx,
            thread,
        })
    }
}

/// Background sweeper. Dropping the handle also stops the thread, without
/// waiting for it.
pub struct SweeperHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the thread and wait for its current pass to finish.
    pub fn stop(self) -> Result<()> {
        // the thread may already have exited
        let _ = self.stop.send(());
        self.thread
            .join()
            .map_err(|_| OrdisError::Corruption("sweeper thread panicked".into()))?;
        log::info!("sweeper stopped");
        Ok(())
    }
}
