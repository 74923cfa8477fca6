//! Whole-population activation snapshots stored as packed bit arrays.
//!
//! A snapshot captures every entity's current activation flag at one instant.
//! Entity ids are stored in ascending order and bit `i` belongs to the `i`-th
//! id. Queries resolve each instant to the latest snapshot at or before it;
//! instants with no earlier snapshot report every entity inactive.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use entity_history::snapshot::ActivationSnapshots;
//! use entity_history::source::MemoryDirectory;
//! use entity_history_types::entity::EntityId;
//!
//! let directory = MemoryDirectory::new();
//! directory.add_account(EntityId(1));
//! directory.add_account(EntityId(2));
//! directory.set_active(EntityId(2), false);
//!
//! let mut snapshots = ActivationSnapshots::in_memory();
//! let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
//! snapshots.take_snapshot(&directory, at)?;
//!
//! let flags = snapshots.entity_activity(at, &[EntityId(1), EntityId(2)])?;
//! assert_eq!(flags, vec![true, false]);
//! # Ok::<(), entity_history::HistoryError>(())
//! ```

#[cfg(feature = "snapshot")]
pub mod file;
pub mod store;

#[cfg(feature = "snapshot")]
pub use file::SnapshotFile;
pub use store::{MemorySnapshotStore, SnapshotRecord, SnapshotStore};

use crate::compute::temporal::{check_sorted, fill_forward_indexes};
use crate::error::Result;
use crate::source::EntityDirectory;
use bit_vec::BitVec;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use entity_history_types::entity::EntityId;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A decoded snapshot record with lazily built lookup structures.
#[derive(Debug)]
pub struct ActivationSnapshot {
    record: SnapshotRecord,
    positions: OnceCell<FxHashMap<EntityId, usize>>,
    bits: OnceCell<BitVec>,
}

impl ActivationSnapshot {
    /// Pack activation flags taken at `time`. Ids are ordered ascending; if an
    /// id repeats, its last flag is kept.
    pub fn pack(time: DateTime<Utc>, flags: &[(EntityId, bool)]) -> Self {
        let ordered: BTreeMap<EntityId, bool> = flags.iter().copied().collect();

        let mut bits = BitVec::from_elem(ordered.len(), false);
        for (i, is_active) in ordered.values().enumerate() {
            bits.set(i, *is_active);
        }

        Self::from_record(SnapshotRecord {
            time,
            entity_ids: ordered.into_keys().collect(),
            activations: Bytes::from(bits.to_bytes()),
        })
    }

    pub fn from_record(record: SnapshotRecord) -> Self {
        Self {
            record,
            positions: OnceCell::new(),
            bits: OnceCell::new(),
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.record.time
    }

    pub fn record(&self) -> &SnapshotRecord {
        &self.record
    }

    pub fn into_record(self) -> SnapshotRecord {
        self.record
    }

    pub fn len(&self) -> usize {
        self.record.entity_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record.entity_ids.is_empty()
    }

    /// Flag of one entity. Entities not in the snapshot are inactive.
    pub fn is_active(&self, entity: EntityId) -> bool {
        let Some(&position) = self.positions().get(&entity) else {
            return false;
        };
        self.bits().get(position).unwrap_or(false)
    }

    pub fn are_active(&self, entities: &[EntityId]) -> Vec<bool> {
        entities.iter().map(|id| self.is_active(*id)).collect()
    }

    fn positions(&self) -> &FxHashMap<EntityId, usize> {
        self.positions.get_or_init(|| {
            self.record
                .entity_ids
                .iter()
                .enumerate()
                .map(|(i, id)| (*id, i))
                .collect()
        })
    }

    fn bits(&self) -> &BitVec {
        self.bits.get_or_init(|| {
            let mut bits = BitVec::from_bytes(&self.record.activations);
            bits.truncate(self.record.entity_ids.len());
            bits
        })
    }
}

/// Takes and queries activation snapshots over a record store.
pub struct ActivationSnapshots<S = MemorySnapshotStore> {
    store: S,
}

impl ActivationSnapshots<MemorySnapshotStore> {
    pub fn in_memory() -> Self {
        Self::new(MemorySnapshotStore::new())
    }
}

impl<S: SnapshotStore> ActivationSnapshots<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Record the directory's current activation flags as of `at`.
    pub fn take_snapshot<D>(&mut self, directory: &D, at: DateTime<Utc>) -> Result<()>
    where
        D: EntityDirectory + ?Sized,
    {
        let flags = directory.activation_flags()?;
        let snapshot = ActivationSnapshot::pack(at, &flags);
        log::debug!(
            "Taking activation snapshot at {}: {} entities",
            at,
            snapshot.len()
        );
        self.store.append(snapshot.into_record())
    }

    /// Activation of every entity at every instant, as `result[instant][entity]`.
    ///
    /// Instants are visited in time order so each snapshot record is loaded
    /// at most once per call.
    pub fn is_active_at(
        &self,
        instants: &[DateTime<Utc>],
        entity_ids: &[EntityId],
    ) -> Result<Vec<Vec<bool>>> {
        let inactive = vec![false; entity_ids.len()];
        let times = self.store.times()?;
        if times.is_empty() {
            return Ok(vec![inactive; instants.len()]);
        }
        check_sorted(&times, "snapshot store times")?;

        let edges = fill_forward_indexes(instants, &times)?;
        let mut order: Vec<usize> = (0..instants.len()).collect();
        order.sort_by_key(|&i| instants[i]);

        let mut out = vec![Vec::new(); instants.len()];
        let mut loaded: Option<(usize, ActivationSnapshot)> = None;
        for i in order {
            let Some(edge) = edges[i] else {
                out[i] = inactive.clone();
                continue;
            };
            if loaded.as_ref().is_none_or(|(index, _)| *index != edge) {
                loaded = Some((edge, ActivationSnapshot::from_record(self.store.load(edge)?)));
            }
            if let Some((_, snapshot)) = &loaded {
                out[i] = snapshot.are_active(entity_ids);
            }
        }
        Ok(out)
    }

    /// One entity at many instants.
    pub fn time_activity(&self, entity: EntityId, instants: &[DateTime<Utc>]) -> Result<Vec<bool>> {
        Ok(self
            .is_active_at(instants, &[entity])?
            .into_iter()
            .map(|row| row.first().copied().unwrap_or(false))
            .collect())
    }

    /// Many entities at one instant.
    pub fn entity_activity(&self, instant: DateTime<Utc>, entities: &[EntityId]) -> Result<Vec<bool>> {
        Ok(self
            .is_active_at(&[instant], entities)?
            .pop()
            .unwrap_or_default())
    }
}
