//! Collaborator abstractions consumed by the resolution engine
//!
//! The engine does not own raw event storage, entity master data, or work
//! calendars. It reads them through the traits in this module, so that
//! different backends can be plugged in while the resolution logic stays the
//! same. In-memory implementations are provided for embedding and tests.

use crate::error::{HistoryError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use entity_history_types::entity::{EntityId, SnapshotId, SnapshotView};
use entity_history_types::event::{ActivationEvent, RefCount, RelationshipFrame};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

/// Source of raw activation and relationship history.
pub trait EventSource: Send + Sync {
    /// Activation flips visible in `view`, ordered by time.
    fn activation_events(&self, view: SnapshotView) -> Result<Vec<ActivationEvent>>;

    /// Relationship frames visible in `view`, ordered by start time.
    fn relationship_frames(&self, view: SnapshotView) -> Result<Vec<RelationshipFrame>>;
}

/// Entity master data.
pub trait EntityDirectory: Send + Sync {
    /// Whether the entity belongs to the leaf/account category.
    fn is_account(&self, entity: EntityId) -> bool;

    /// `(entity, IANA zone name)` for every entity with a configured zone.
    fn timezones(&self) -> Result<Vec<(EntityId, String)>>;

    /// Current activation flag of every entity.
    fn activation_flags(&self) -> Result<Vec<(EntityId, bool)>>;
}

/// Work-day calendar (weekends, holidays) for an entity.
pub trait WorkCalendar: Send + Sync {
    fn is_work_day(&self, entity: EntityId, day: NaiveDate) -> bool;
}

impl<F> WorkCalendar for F
where
    F: Fn(EntityId, NaiveDate) -> bool + Send + Sync,
{
    fn is_work_day(&self, entity: EntityId, day: NaiveDate) -> bool {
        self(entity, day)
    }
}

/// Ready-made day-off ref-count series from the schedule pipeline.
pub trait ScheduleSource: Send + Sync {
    fn ref_counts(&self, view: SnapshotView) -> Result<Vec<RefCount>>;
}

#[derive(Debug, Clone, Default)]
struct EventSet {
    activations: Vec<ActivationEvent>,
    relationships: Vec<RelationshipFrame>,
}

/// In-memory event source with a live event set and frozen snapshots.
#[derive(Debug, Default)]
pub struct MemoryEventSource {
    live: RwLock<EventSet>,
    snapshots: RwLock<FxHashMap<SnapshotId, EventSet>>,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_activation(&self, event: ActivationEvent) {
        self.live.write().activations.push(event);
    }

    pub fn record_relationship(&self, frame: RelationshipFrame) {
        self.live.write().relationships.push(frame);
    }

    /// Freeze the current live events under `id`. Later live writes do not
    /// affect the frozen view.
    pub fn freeze(&self, id: SnapshotId) {
        let frozen = self.live.read().clone();
        self.snapshots.write().insert(id, frozen);
    }

    fn with_view<T>(&self, view: SnapshotView, f: impl FnOnce(&EventSet) -> T) -> Result<T> {
        match view {
            SnapshotView::Live => Ok(f(&self.live.read())),
            SnapshotView::At(id) => self
                .snapshots
                .read()
                .get(&id)
                .map(f)
                .ok_or(HistoryError::SnapshotNotFound(id)),
        }
    }
}

impl EventSource for MemoryEventSource {
    fn activation_events(&self, view: SnapshotView) -> Result<Vec<ActivationEvent>> {
        self.with_view(view, |set| {
            let mut events = set.activations.clone();
            events.sort_by_key(|event| event.time);
            events
        })
    }

    fn relationship_frames(&self, view: SnapshotView) -> Result<Vec<RelationshipFrame>> {
        self.with_view(view, |set| {
            let mut frames = set.relationships.clone();
            frames.sort_by_key(|frame| frame.start);
            frames
        })
    }
}

/// In-memory entity directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    accounts: RwLock<FxHashSet<EntityId>>,
    zones: RwLock<FxHashMap<EntityId, String>>,
    active: RwLock<BTreeMap<EntityId, bool>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account-kind (leaf) entity.
    pub fn add_account(&self, entity: EntityId) {
        self.accounts.write().insert(entity);
        self.active.write().entry(entity).or_insert(true);
    }

    /// Register a non-account entity (team, role, ...).
    pub fn add_group(&self, entity: EntityId) {
        self.active.write().entry(entity).or_insert(true);
    }

    pub fn set_timezone(&self, entity: EntityId, zone: impl Into<String>) {
        self.zones.write().insert(entity, zone.into());
    }

    pub fn set_active(&self, entity: EntityId, is_active: bool) {
        self.active.write().insert(entity, is_active);
    }
}

impl EntityDirectory for MemoryDirectory {
    fn is_account(&self, entity: EntityId) -> bool {
        self.accounts.read().contains(&entity)
    }

    fn timezones(&self) -> Result<Vec<(EntityId, String)>> {
        Ok(self
            .zones
            .read()
            .iter()
            .map(|(id, zone)| (*id, zone.clone()))
            .collect())
    }

    fn activation_flags(&self) -> Result<Vec<(EntityId, bool)>> {
        Ok(self.active.read().iter().map(|(id, flag)| (*id, *flag)).collect())
    }
}

/// Monday-to-Friday calendar with an optional holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }
}

impl WorkCalendar for WeekdayCalendar {
    fn is_work_day(&self, _entity: EntityId, day: NaiveDate) -> bool {
        !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&day)
    }
}

/// In-memory ref-count series, served identically for every view.
#[derive(Debug, Default)]
pub struct MemoryScheduleSource {
    records: RwLock<Vec<RefCount>>,
}

impl MemoryScheduleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: RefCount) {
        self.records.write().push(record);
    }
}

impl ScheduleSource for MemoryScheduleSource {
    fn ref_counts(&self, _view: SnapshotView) -> Result<Vec<RefCount>> {
        Ok(self.records.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_frozen_view_ignores_later_writes() {
        let source = MemoryEventSource::new();
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        source.record_activation(ActivationEvent::new(EntityId(1), t, true));
        source.freeze(SnapshotId(1));
        source.record_activation(ActivationEvent::new(EntityId(2), t, true));

        let frozen = source.activation_events(SnapshotView::At(SnapshotId(1))).unwrap();
        let live = source.activation_events(SnapshotView::Live).unwrap();
        assert_eq!(frozen.len(), 1);
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn test_unknown_snapshot_is_error() {
        let source = MemoryEventSource::new();
        let err = source
            .relationship_frames(SnapshotView::At(SnapshotId(9)))
            .unwrap_err();
        assert!(matches!(err, HistoryError::SnapshotNotFound(SnapshotId(9))));
    }

    #[test]
    fn test_directory_flags_sorted_by_id() {
        let directory = MemoryDirectory::new();
        directory.add_account(EntityId(5));
        directory.add_group(EntityId(2));
        directory.set_active(EntityId(5), false);

        assert!(directory.is_account(EntityId(5)));
        assert!(!directory.is_account(EntityId(2)));
        assert_eq!(
            directory.activation_flags().unwrap(),
            vec![(EntityId(2), true), (EntityId(5), false)]
        );
    }

    #[test]
    fn test_weekday_calendar() {
        let holiday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let calendar = WeekdayCalendar::with_holidays([holiday]);
        let e = EntityId(1);

        assert!(!calendar.is_work_day(e, holiday));
        assert!(calendar.is_work_day(e, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        // Saturday
        assert!(!calendar.is_work_day(e, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()));
    }

    #[test]
    fn test_closure_calendar() {
        let every_day = |_: EntityId, _: NaiveDate| true;
        assert!(every_day.is_work_day(EntityId(1), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()));
    }
}
