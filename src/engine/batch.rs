//! ORDIS - Write Batch
//! A group of mutations applied to the ordered engine as one atomic unit.

use serde::{Deserialize, Serialize};

use crate::types::{Key, Value};

/// One mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOp {
    Put { key: Key, value: Value },
    Delete { key: Key },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Ordered list of mutations. Later operations on the same key win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Key, value: Value) -> &mut Self {
        self.ops.push(BatchOp::Put { key, value });
        self
    }

    pub fn delete(&mut self, key: Key) -> &mut Self {
        self.ops.push(BatchOp::Delete { key });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

impl From<Vec<BatchOp>> for WriteBatch {
    fn from(ops: Vec<BatchOp>) -> Self {
        Self { ops }
    }
}
