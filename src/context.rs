//! Resolution contexts: compiled histories bound to one view of the event store.
//!
//! A `TemporalResolutionContext` is loaded once from its collaborators and is
//! read-only afterwards, apart from its own entity-day cache. `EntityState`
//! pairs a context for a frozen snapshot with one for the live view so the two
//! can be compared, and stashes per-period results.

use crate::aggregate::{DaySource, EntityDayAggregator};
use crate::compute::temporal::{Localizer, PeriodClock};
use crate::config::Config;
use crate::error::{HistoryError, Result};
use crate::history::{ActivationHistory, Direction, MemberSet, RelationshipHistory, ScheduleHistory};
use crate::source::{EntityDirectory, EventSource, ScheduleSource, WorkCalendar};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use entity_history_types::entity::{EntityId, SnapshotView};
use entity_history_types::period::{EntityDays, TimeGroup};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Collaborators a context is loaded from.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub events: &'a dyn EventSource,
    pub directory: &'a dyn EntityDirectory,
    pub schedule: &'a dyn ScheduleSource,
}

pub struct TemporalResolutionContext {
    view: SnapshotView,
    config: Config,
    localizer: Localizer,
    activation: ActivationHistory,
    relationships: RelationshipHistory,
    schedule: ScheduleHistory,
    calendar: Arc<dyn WorkCalendar>,
    aggregator: EntityDayAggregator,
}

impl TemporalResolutionContext {
    /// Compile every history for `view`. All logs are fully built before the
    /// context is returned.
    pub fn load(
        view: SnapshotView,
        config: Config,
        sources: Sources<'_>,
        calendar: Arc<dyn WorkCalendar>,
    ) -> Result<Self> {
        config.validate().map_err(HistoryError::InvalidConfig)?;

        let localizer = Localizer::from_names(
            sources.directory.timezones()?,
            config.default_tz(),
            config.overflow_retry_days,
        );
        let activation =
            ActivationHistory::build(sources.events.activation_events(view)?, &localizer)?;
        let relationships = RelationshipHistory::build(
            &sources.events.relationship_frames(view)?,
            |id| sources.directory.is_account(id),
            config.far_future(),
            &localizer,
        )?;
        let schedule = ScheduleHistory::build(&sources.schedule.ref_counts(view)?)?;
        let aggregator = EntityDayAggregator::new(config.window_lead_days, config.window_tail_days);

        log::info!(
            "Loaded resolution context for {:?}: {} entities with activation history",
            view,
            activation.entity_count()
        );

        Ok(Self {
            view,
            config,
            localizer,
            activation,
            relationships,
            schedule,
            calendar,
            aggregator,
        })
    }

    pub fn view(&self) -> SnapshotView {
        self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn activation(&self) -> &ActivationHistory {
        &self.activation
    }

    pub fn relationships(&self) -> &RelationshipHistory {
        &self.relationships
    }

    /// Local day of `time` for `entity`.
    pub fn local_day(&self, entity: EntityId, time: DateTime<Utc>) -> Result<NaiveDate> {
        self.localizer.local_day(entity, time)
    }

    pub fn is_active(&self, entity: EntityId, time: DateTime<Utc>) -> Result<bool> {
        self.activation.is_active(entity, time, &self.localizer)
    }

    pub fn is_active_on(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.activation.is_active_on(entity, day)
    }

    /// Subs of `entity` at `time`, judged on the entity's local day.
    pub fn get_subs(&self, entity: EntityId, time: DateTime<Utc>, include_self: bool) -> Result<MemberSet> {
        Ok(self.get_subs_on(entity, self.local_day(entity, time)?, include_self))
    }

    pub fn get_subs_on(&self, entity: EntityId, day: NaiveDate, include_self: bool) -> MemberSet {
        self.relationships
            .get_members(Direction::Below, entity, day, include_self)
    }

    /// Supers of `entity` at `time`, judged on the entity's local day.
    pub fn get_supers(&self, entity: EntityId, time: DateTime<Utc>, include_self: bool) -> Result<MemberSet> {
        Ok(self.get_supers_on(entity, self.local_day(entity, time)?, include_self))
    }

    pub fn get_supers_on(&self, entity: EntityId, day: NaiveDate, include_self: bool) -> MemberSet {
        self.relationships
            .get_members(Direction::Above, entity, day, include_self)
    }

    pub fn is_super_entity(&self, entity: EntityId) -> bool {
        self.relationships.is_super(entity)
    }

    /// Non-zero day-off ref count. Weekends are not considered here.
    pub fn scheduled_day_off(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.schedule.scheduled_day_off(entity, day)
    }

    /// Calendar work day on which the entity is active.
    pub fn is_work_day(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.calendar.is_work_day(entity, day) && self.is_active_on(entity, day)
    }

    pub fn should_be_at_work(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.is_work_day(entity, day) && !self.scheduled_day_off(entity, day)
    }

    /// Entity-days over the inclusive local-day range `[start, end]`.
    ///
    /// `min`/`max` bound the cached cumulative table; see
    /// [`EntityDayAggregator::get_entity_days`].
    pub fn get_entity_days(
        &self,
        entity: EntityId,
        start: NaiveDate,
        end: NaiveDate,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    ) -> Result<EntityDays> {
        self.aggregator
            .get_entity_days(self, entity, start, end, min, max)
    }

    pub fn aggregator(&self) -> &EntityDayAggregator {
        &self.aggregator
    }
}

impl DaySource for TemporalResolutionContext {
    fn is_super_entity(&self, entity: EntityId) -> bool {
        self.relationships.is_super(entity)
    }

    fn members_below(&self, entity: EntityId, day: NaiveDate, include_self: bool) -> MemberSet {
        self.get_subs_on(entity, day, include_self)
    }

    fn is_active_on(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.activation.is_active_on(entity, day)
    }

    fn counts_as_work_day(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.is_work_day(entity, day)
    }

    fn scheduled_day_off(&self, entity: EntityId, day: NaiveDate) -> bool {
        self.schedule.scheduled_day_off(entity, day)
    }
}

impl std::fmt::Debug for TemporalResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalResolutionContext")
            .field("view", &self.view)
            .field("timezones", &self.localizer.len())
            .field("activation_entities", &self.activation.entity_count())
            .field("cached_tables", &self.aggregator.cached_tables())
            .finish()
    }
}

/// Identifies one stashed period result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StashKey {
    pub entity: EntityId,
    pub group: TimeGroup,
    pub period_start: NaiveDate,
    pub adjusted: bool,
}

/// Entity-days for one period, as seen by the snapshot and by the live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StashValue {
    pub raw_entity_days: u64,
    /// Adjusted count.
    pub entity_days: u64,
    pub current_raw_entity_days: u64,
    pub current_entity_days: u64,
}

/// A snapshot context paired with the live context, plus a per-period stash.
pub struct EntityState {
    snapshot: Arc<TemporalResolutionContext>,
    current: Arc<TemporalResolutionContext>,
    clock: Arc<dyn PeriodClock>,
    stash: DashMap<StashKey, Arc<OnceCell<StashValue>>>,
}

impl EntityState {
    /// Pair two contexts. `current` must be bound to the live view.
    pub fn new(
        snapshot: Arc<TemporalResolutionContext>,
        current: Arc<TemporalResolutionContext>,
        clock: Arc<dyn PeriodClock>,
    ) -> Result<Self> {
        if !current.view().is_live() {
            return Err(HistoryError::InvalidConfig(format!(
                "current context must be live, got {:?}",
                current.view()
            )));
        }
        Ok(Self {
            snapshot,
            current,
            clock,
            stash: DashMap::new(),
        })
    }

    /// Both sides are the same live context.
    pub fn live(context: Arc<TemporalResolutionContext>, clock: Arc<dyn PeriodClock>) -> Result<Self> {
        Self::new(context.clone(), context, clock)
    }

    pub fn snapshot(&self) -> &TemporalResolutionContext {
        &self.snapshot
    }

    pub fn current(&self) -> &TemporalResolutionContext {
        &self.current
    }

    pub fn is_live(&self) -> bool {
        Arc::ptr_eq(&self.snapshot, &self.current)
    }

    /// Entity-days for the `group` period containing `day`, from both views.
    ///
    /// The window spans the period padded by one day before and two after.
    /// Results are cached per period start, so any day in the same period
    /// hits the same entry. `adjusted` only distinguishes cache entries; the
    /// stored counts are always the adjusted ones.
    pub fn stashed_entity_days(
        &self,
        entity: EntityId,
        group: TimeGroup,
        day: NaiveDate,
        adjusted: bool,
    ) -> Result<StashValue> {
        let period_start = self.clock.floor(group, day);
        let key = StashKey {
            entity,
            group,
            period_start,
            adjusted,
        };
        let cell = self.stash.entry(key).or_default().clone();
        cell.get_or_try_init(|| self.compute_stash_value(entity, group, period_start))
            .copied()
    }

    pub fn stash_len(&self) -> usize {
        self.stash.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    fn compute_stash_value(
        &self,
        entity: EntityId,
        group: TimeGroup,
        start: NaiveDate,
    ) -> Result<StashValue> {
        let end = self.clock.period_end(group, start);
        let out_of_range = |day| HistoryError::WindowOutOfRange { entity, day };
        let min = start.pred_opt().ok_or_else(|| out_of_range(start))?;
        let max = end
            .checked_add_signed(Duration::days(2))
            .ok_or_else(|| out_of_range(end))?;

        let frozen = self
            .snapshot
            .get_entity_days(entity, start, end, Some(min), Some(max))?;
        let live = self
            .current
            .get_entity_days(entity, start, end, Some(min), Some(max))?;

        Ok(StashValue {
            raw_entity_days: frozen.raw,
            entity_days: frozen.adjusted,
            current_raw_entity_days: live.raw,
            current_entity_days: live.adjusted,
        })
    }
}

impl std::fmt::Debug for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityState")
            .field("snapshot", &self.snapshot)
            .field("current", &self.current)
            .field("stashed", &self.stash_len())
            .finish()
    }
}
