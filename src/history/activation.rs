//! Per-entity activation history compiled from raw activation events.

use super::change_log::ChangeLog;
use crate::compute::temporal::Localizer;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use entity_history_types::entity::EntityId;
use entity_history_types::event::{ActivationEvent, ActivationFrame};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Ascending day-level activation flips for every entity seen in the events.
///
/// Entities without any recorded event are inactive at every time.
#[derive(Debug, Clone, Default)]
pub struct ActivationHistory {
    logs: FxHashMap<EntityId, ChangeLog<bool>>,
}

impl ActivationHistory {
    /// Compile activation events into per-entity logs.
    ///
    /// Each event is localized to its entity's zone and bucketed to the local
    /// day. When an entity has several events on one day, the chronologically
    /// last one decides that day's state.
    pub fn build(mut events: Vec<ActivationEvent>, localizer: &Localizer) -> Result<Self> {
        // stable: events sharing an instant keep source order
        events.sort_by_key(|event| event.time);

        let mut changes: BTreeMap<(EntityId, NaiveDate), bool> = BTreeMap::new();
        for event in &events {
            let day = localizer.local_day(event.entity_id, event.time)?;
            changes.insert((event.entity_id, day), event.is_active);
        }

        let mut logs: FxHashMap<EntityId, ChangeLog<bool>> = FxHashMap::default();
        for ((entity, day), is_active) in changes {
            logs.entry(entity).or_default().push(day, is_active)?;
        }

        log::debug!(
            "Activation history built: {} events, {} entities",
            events.len(),
            logs.len()
        );

        Ok(Self { logs })
    }

    /// Compile activation frames, closing open frames at `far_future`.
    pub fn from_frames(
        frames: &[ActivationFrame],
        far_future: DateTime<Utc>,
        localizer: &Localizer,
    ) -> Result<Self> {
        let events = frames
            .iter()
            .flat_map(|frame| frame.events(far_future))
            .collect();
        Self::build(events, localizer)
    }

    /// Whether `entity` was active on local `day`.
    pub fn is_active_on(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.logs
            .get(&entity)
            .and_then(|log| log.value_at(day))
            .copied()
            .unwrap_or(false)
    }

    /// Whether `entity` was active at a UTC instant, judged on its local day.
    pub fn is_active(&self, entity: EntityId, time: DateTime<Utc>, localizer: &Localizer) -> Result<bool> {
        Ok(self.is_active_on(entity, localizer.local_day(entity, time)?))
    }

    pub fn log(&self, entity: EntityId) -> Option<&ChangeLog<bool>> {
        self.logs.get(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.logs.len()
    }
}
