//! Storage for bitset activation records.

use crate::error::{HistoryError, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entity_history_types::entity::EntityId;
use serde::{Deserialize, Serialize};

/// Persisted form of one whole-population activation snapshot.
///
/// Bit `i` of `activations` belongs to `entity_ids[i]`. Trailing padding bits
/// in the last byte are never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub time: DateTime<Utc>,
    pub entity_ids: Vec<EntityId>,
    pub activations: Bytes,
}

impl SnapshotRecord {
    /// Check that the packed array covers every listed id.
    pub fn validate(&self) -> Result<()> {
        if self.activations.len() * 8 < self.entity_ids.len() {
            return Err(HistoryError::InvalidFormat);
        }
        Ok(())
    }
}

/// Append-only record store, addressed by position in ascending time order.
pub trait SnapshotStore: Send + Sync {
    /// Store a new record. Existing records are never modified.
    fn append(&mut self, record: SnapshotRecord) -> Result<()>;

    /// Record times, ascending. Position `i` matches `load(i)`.
    fn times(&self) -> Result<Vec<DateTime<Utc>>>;

    fn load(&self, index: usize) -> Result<SnapshotRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records kept in memory, sorted by time.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    records: Vec<SnapshotRecord>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn append(&mut self, record: SnapshotRecord) -> Result<()> {
        record.validate()?;
        // after any record sharing the same time
        let at = self.records.partition_point(|r| r.time <= record.time);
        self.records.insert(at, record);
        Ok(())
    }

    fn times(&self) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.records.iter().map(|r| r.time).collect())
    }

    fn load(&self, index: usize) -> Result<SnapshotRecord> {
        self.records
            .get(index)
            .cloned()
            .ok_or(HistoryError::InvalidFormat)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
