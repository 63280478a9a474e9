//! ORDIS - Store Configuration
//! Tunable parameters for the engine, the keyspace and the sweeper.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrdisError, Result};
use crate::slot::DEFAULT_SLOT_COUNT;

/// Configuration for an ordis store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory for all data files (WAL).
    pub data_dir: PathBuf,

    /// Whether to sync WAL writes to disk immediately (fsync).
    pub sync_writes: bool,

    /// Number of slots user keys are hashed into.
    pub slot_count: u16,

    /// Maximum delete markers consumed by one sweeper pass.
    pub sweep_batch_size: usize,

    /// Pause between background sweeper passes.
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sync_writes: true,
            slot_count: DEFAULT_SLOT_COUNT,
            sweep_batch_size: 128,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl Config {
    /// Create a new Config with a custom data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Build a Config from `ORDIS_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(dir) = lookup("ORDIS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(sync) = lookup("ORDIS_SYNC_WRITES") {
            config.sync_writes = parse_var("ORDIS_SYNC_WRITES", &sync)?;
        }
        if let Some(slots) = lookup("ORDIS_SLOT_COUNT") {
            config.slot_count = parse_var("ORDIS_SLOT_COUNT", &slots)?;
        }
        if let Some(batch) = lookup("ORDIS_SWEEP_BATCH") {
            config.sweep_batch_size = parse_var("ORDIS_SWEEP_BATCH", &batch)?;
        }
        if let Some(ms) = lookup("ORDIS_SWEEP_INTERVAL_MS") {
            config.sweep_interval = Duration::from_millis(parse_var("ORDIS_SWEEP_INTERVAL_MS", &ms)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_slot_count(mut self, slot_count: u16) -> Self {
        self.slot_count = slot_count;
        self
    }

    pub fn with_sweep_batch_size(mut self, size: usize) -> Self {
        self.sweep_batch_size = size;
        self
    }

    /// Reject settings the store cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 {
            return Err(OrdisError::Config("slot_count must be positive".into()));
        }
        if self.sweep_batch_size == 0 {
            return Err(OrdisError::Config(
                "sweep_batch_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Ensure the data directory exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| OrdisError::Config(format!("{} has invalid value {:?}", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_count, DEFAULT_SLOT_COUNT);
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ORDIS_DATA_DIR", "/tmp/ordis"),
            ("ORDIS_SYNC_WRITES", "false"),
            ("ORDIS_SLOT_COUNT", "64"),
            ("ORDIS_SWEEP_INTERVAL_MS", "250"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ordis"));
        assert!(!config.sync_writes);
        assert_eq!(config.slot_count, 64);
        assert_eq!(config.sweep_batch_size, 128);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_values_rejected() {
        let bad = Config::from_lookup(|k| (k == "ORDIS_SLOT_COUNT").then(|| "lots".to_string()));
        assert!(matches!(bad, Err(OrdisError::Config(_))));

        let zero = Config::from_lookup(|k| (k == "ORDIS_SWEEP_BATCH").then(|| "0".to_string()));
        assert!(matches!(zero, Err(OrdisError::Config(_))));
    }
}
