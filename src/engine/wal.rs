//! ORDIS - Write-Ahead Log (WAL)
//! Provides durability by logging every write batch to disk before it is
//! applied to the in-memory MemTable. One batch is one record, so a batch
//! is either replayed whole or not at all.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::batch::{BatchOp, WriteBatch};
use super::memtable::MemTable;
use crate::error::{OrdisError, Result};

/// Bytes of the length prefix and of the trailing checksum.
const LEN_BYTES: usize = 4;
const CRC_BYTES: usize = 4;

/// Write-Ahead Log for crash recovery and durability.
///
/// ## Binary Format (per batch)
/// ```text
/// [payload_len: 4 bytes (LE)][payload: bincode(Vec<BatchOp>)][crc: 4 bytes (LE)]
/// ```
/// The CRC covers the length prefix and the payload.
pub struct WriteAheadLog {
    /// Path to the WAL file on disk.
    path: PathBuf,
    /// File handle opened for appending.
    file: File,
    /// fsync after every append.
    sync_writes: bool,
}

impl WriteAheadLog {
    /// Open or create a WAL file at the specified path.
    pub fn open(path: PathBuf, sync_writes: bool) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file,
            sync_writes,
        })
    }

    /// Returns the path to the WAL file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Encode a batch into one framed record.
    fn encode_record(ops: &[BatchOp]) -> Result<Vec<u8>> {
        let payload = bincode::serialize(ops)?;
        let mut buf = Vec::with_capacity(LEN_BYTES + payload.len() + CRC_BYTES);
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&payload);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        Ok(buf)
    }

    /// Append a batch to the WAL, syncing if configured.
    pub fn append(&mut self, batch: &WriteBatch) -> Result<()> {
        let encoded = Self::encode_record(batch.ops())?;
        self.file.write_all(&encoded)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Rebuild a MemTable by replaying the WAL at `path`.
    ///
    /// A missing file yields an empty table. A record cut short at the end of
    /// the file (crash during append) is dropped; a complete record whose
    /// checksum does not match is corruption.
    pub fn recover(path: &Path) -> Result<(MemTable, usize)> {
        let mut memtable = MemTable::new();
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok((memtable, 0)),
            Err(err) => return Err(err.into()),
        };

        let mut offset = 0;
        let mut batches = 0;
        let mut torn = false;
        while offset < data.len() {
            let rest = &data[offset..];
            if rest.len() < LEN_BYTES {
                log::warn!("WAL {:?}: discarding torn header at offset {}", path, offset);
                torn = true;
                break;
            }
            let mut len_bytes = [0u8; LEN_BYTES];
            len_bytes.copy_from_slice(&rest[..LEN_BYTES]);
            let payload_len = u32::from_le_bytes(len_bytes) as usize;
            let record_len = LEN_BYTES + payload_len + CRC_BYTES;
            if rest.len() < record_len {
                log::warn!("WAL {:?}: discarding torn record at offset {}", path, offset);
                torn = true;
                break;
            }

            let body = &rest[..LEN_BYTES + payload_len];
            let mut crc_bytes = [0u8; CRC_BYTES];
            crc_bytes.copy_from_slice(&rest[LEN_BYTES + payload_len..record_len]);
            if crc32fast::hash(body) != u32::from_le_bytes(crc_bytes) {
                return Err(OrdisError::Corruption(format!(
                    "WAL checksum mismatch at offset {}",
                    offset
                )));
            }

            let ops: Vec<BatchOp> = bincode::deserialize(&body[LEN_BYTES..])
                .map_err(|e| OrdisError::RecoveryFailed(e.to_string()))?;
            for op in ops {
                memtable.apply(op);
            }
            batches += 1;
            offset += record_len;
        }

        // later appends must follow the last good record
        if torn {
            OpenOptions::new()
                .write(true)
                .open(path)?
                .set_len(offset as u64)?;
        }

        Ok((memtable, batches))
    }

    /// Replace the log with a single record holding the current contents.
    /// The snapshot is written to a side file and renamed over the log.
    pub fn checkpoint(&mut self, memtable: &MemTable) -> Result<()> {
        let ops: Vec<BatchOp> = memtable
            .entries()
            .iter()
            .map(|(key, value)| BatchOp::Put {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        let tmp_path = self.path.with_extension("wal.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            if !ops.is_empty() {
                tmp.write_all(&Self::encode_record(&ops)?)?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        // Reopen in append mode
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}
