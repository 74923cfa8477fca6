//! Scheduled time off, as a per-entity day-off ref-count series.

use super::change_log::ChangeLog;
use crate::error::Result;
use chrono::NaiveDate;
use entity_history_types::entity::EntityId;
use entity_history_types::event::RefCount;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Fill-forward day-off ref counts. A non-zero count means scheduled off.
///
/// This does not know about weekends; it treats every day as a potential
/// work day. Calendars are applied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScheduleHistory {
    logs: FxHashMap<EntityId, ChangeLog<u32>>,
}

impl ScheduleHistory {
    /// Build from ref-count records. Several records for the same entity and
    /// day collapse to the last one supplied.
    pub fn build(records: &[RefCount]) -> Result<Self> {
        let mut by_day: BTreeMap<(EntityId, NaiveDate), u32> = BTreeMap::new();
        for record in records {
            by_day.insert((record.entity_id, record.day), record.ref_count);
        }

        let mut logs: FxHashMap<EntityId, ChangeLog<u32>> = FxHashMap::default();
        for ((entity, day), ref_count) in by_day {
            logs.entry(entity).or_default().push(day, ref_count)?;
        }

        log::debug!("Schedule history built: {} entities", logs.len());
        Ok(Self { logs })
    }

    pub fn ref_count(&self, entity: EntityId, day: NaiveDate) -> u32 {
        self.logs
            .get(&entity)
            .and_then(|log| log.value_at(day))
            .copied()
            .unwrap_or(0)
    }

    pub fn scheduled_day_off(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.ref_count(entity, day) != 0
    }
}
