//! ORDIS - Version / Delete Protocol
//!
//! A collection is deleted in O(1): its meta record is flagged (or replaced)
//! and a [`DeleteKey`] naming the retired generation is queued, both in one
//! write batch. Item rows of that generation stay on disk until the sweeper
//! consumes the marker, but no reader sees them because every read is
//! bounded to the item prefix of the meta's current version.
//!
//! ```text
//! Absent -> Live(v) -> Deleted(v) -> Live(v'), v' > v
//! ```
//!
//! A new generation never reuses a version that still has a pending marker
//! for the same key, so the sweeper cannot erase live rows.

use std::collections::HashSet;

use crate::codec::{prefix_upper_bound, DeleteKey, ListMetaVal, MetaKey, MetaVal, MetaValue};
use crate::engine::{OrderedStore, WriteBatch};
use crate::error::{OrdisError, Result};
use crate::types::{DeletionFlag, Slot, Version};

/// Marker rows fetched per engine scan.
const MARKER_SCAN_CHUNK: usize = 64;

/// Lifecycle state of a key as seen through its meta record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    /// No meta record, or a plain value (which carries no version).
    Absent,
    Live { version: Version, length: u64 },
    Deleted { version: Version },
}

impl VersionState {
    pub fn of(meta: Option<&MetaValue>) -> Self {
        match meta {
            None | Some(MetaValue::Kv(_)) => VersionState::Absent,
            Some(MetaValue::Collection(m)) => Self::from_parts(m.version, m.flag, m.length),
            Some(MetaValue::List(m)) => Self::from_parts(m.version, m.flag, m.length),
        }
    }

    fn from_parts(version: Version, flag: DeletionFlag, length: u64) -> Self {
        match flag {
            DeletionFlag::Enabled => VersionState::Live { version, length },
            DeletionFlag::Deleted => VersionState::Deleted { version },
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, VersionState::Live { .. })
    }
}

/// Version for a fresh generation following `state`, skipping any version
/// in `pending`.
pub fn next_version(state: VersionState, pending: &[Version]) -> Result<Version> {
    let mut candidate = match state {
        VersionState::Absent => 0,
        VersionState::Live { version, .. } | VersionState::Deleted { version } => {
            version.wrapping_add(1)
        }
    };
    let taken: HashSet<Version> = pending.iter().copied().collect();
    for _ in 0..=u16::MAX as u32 {
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        candidate = candidate.wrapping_add(1);
    }
    Err(OrdisError::InvalidArgument(
        "every version of this key awaits sweeping".into(),
    ))
}

/// Versions of `key` with a marker still queued.
pub fn pending_versions<S: OrderedStore>(store: &S, slot: Slot, key: &[u8]) -> Result<Vec<Version>> {
    let prefix = DeleteKey::key_prefix(slot, key);
    let upper = prefix_upper_bound(&prefix);
    store
        .scan(&prefix, upper.as_deref(), usize::MAX)?
        .into_iter()
        .map(|(raw, _)| {
            DeleteKey::decode(&raw)
                .map(|marker| marker.version)
                .map_err(OrdisError::from)
        })
        .collect()
}

/// Up to `limit` queued markers, in key order.
pub fn pending_markers<S: OrderedStore>(store: &S, limit: usize) -> Result<Vec<DeleteKey>> {
    pending_markers_after(store, None, limit)
}

/// Up to `limit` queued markers ordered after `after`.
///
/// Undecodable rows in the marker range are logged and skipped without
/// counting toward `limit`, so they cannot starve the markers behind them.
pub fn pending_markers_after<S: OrderedStore>(
    store: &S,
    after: Option<&DeleteKey>,
    limit: usize,
) -> Result<Vec<DeleteKey>> {
    let prefix = DeleteKey::queue_prefix();
    let upper = prefix_upper_bound(&prefix);
    let mut cursor = match after {
        Some(marker) => {
            let mut next = marker.encode();
            next.push(0);
            next
        }
        None => prefix,
    };
    let mut markers = Vec::new();
    while markers.len() < limit {
        let rows = store.scan(&cursor, upper.as_deref(), MARKER_SCAN_CHUNK)?;
        let exhausted = rows.len() < MARKER_SCAN_CHUNK;
        for (raw, _) in &rows {
            if markers.len() == limit {
                break;
            }
            match DeleteKey::decode(raw) {
                Ok(marker) => markers.push(marker),
                // a foreign row in the marker range is not ours to consume
                Err(err) => log::error!("skipping undecodable delete marker {:?}: {}", raw, err),
            }
        }
        match rows.last() {
            Some((last, _)) if !exhausted => {
                cursor = last.clone();
                cursor.push(0);
            }
            _ => break,
        }
    }
    Ok(markers)
}

/// Stage retirement of the live generation `version` of `key`.
///
/// `replacement` is written in place of the meta record; `None` keeps the
/// record with its deletion flag set. The marker is staged in the same batch.
pub fn stage_retire(
    batch: &mut WriteBatch,
    slot: Slot,
    key: &[u8],
    meta: &MetaValue,
    replacement: Option<MetaValue>,
) -> Option<DeleteKey> {
    let version = match VersionState::of(Some(meta)) {
        VersionState::Live { version, .. } => version,
        _ => return None,
    };
    let new_meta = replacement.unwrap_or_else(|| mark_deleted(meta));
    let marker = DeleteKey::new(slot, key.to_vec(), version);

    batch.put(MetaKey::new(slot, key.to_vec()).encode(), new_meta.encode());
    batch.put(marker.encode(), Vec::new());
    log::debug!(
        "retiring generation {} of {:?} (slot {})",
        version,
        String::from_utf8_lossy(key),
        slot
    );
    Some(marker)
}

/// Copy of `meta` flagged deleted with no elements.
pub fn mark_deleted(meta: &MetaValue) -> MetaValue {
    match meta {
        MetaValue::Kv(v) => MetaValue::Kv(v.clone()),
        MetaValue::Collection(m) => MetaValue::Collection(MetaVal {
            flag: DeletionFlag::Deleted,
            length: 0,
            ..*m
        }),
        MetaValue::List(m) => MetaValue::List(ListMetaVal {
            flag: DeletionFlag::Deleted,
            length: 0,
            ..*m
        }),
    }
}
