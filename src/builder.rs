//! Builder wiring collaborators into resolution contexts.

use crate::compute::temporal::{CalendarClock, PeriodClock};
use crate::config::Config;
use crate::context::{EntityState, Sources, TemporalResolutionContext};
use crate::error::{HistoryError, Result};
use crate::source::{
    EntityDirectory, EventSource, MemoryScheduleSource, ScheduleSource, WeekdayCalendar,
    WorkCalendar,
};
use entity_history_types::entity::SnapshotView;
use std::sync::Arc;

/// Builder for resolution contexts.
///
/// The event source and entity directory are required. Without a schedule
/// source nobody is ever scheduled off; without a calendar Monday to Friday
/// are work days; without a clock periods follow the Gregorian calendar with
/// weeks starting on `Config::week_start`.
pub struct StateBuilder {
    config: Config,
    view: SnapshotView,
    events: Option<Arc<dyn EventSource>>,
    directory: Option<Arc<dyn EntityDirectory>>,
    schedule: Option<Arc<dyn ScheduleSource>>,
    calendar: Option<Arc<dyn WorkCalendar>>,
    clock: Option<Arc<dyn PeriodClock>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            view: SnapshotView::Live,
            events: None,
            directory: None,
            schedule: None,
            calendar: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// View of the event store the snapshot side is bound to.
    pub fn view(mut self, view: SnapshotView) -> Self {
        self.view = view;
        self
    }

    pub fn event_source(mut self, events: Arc<dyn EventSource>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn EntityDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn schedule_source(mut self, schedule: Arc<dyn ScheduleSource>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn calendar(mut self, calendar: Arc<dyn WorkCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn PeriodClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Load a single context bound to `view`.
    pub fn build_context(&self) -> Result<TemporalResolutionContext> {
        self.load(self.view)
    }

    /// Load the snapshot context and the live context. When the view is live
    /// a single context serves as both.
    pub fn build_state(&self) -> Result<EntityState> {
        let clock = self
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(CalendarClock::new(self.config.week_start)));

        let current = Arc::new(self.load(SnapshotView::Live)?);
        if self.view.is_live() {
            return EntityState::live(current, clock);
        }
        let snapshot = Arc::new(self.load(self.view)?);
        EntityState::new(snapshot, current, clock)
    }

    fn load(&self, view: SnapshotView) -> Result<TemporalResolutionContext> {
        let events = self
            .events
            .as_deref()
            .ok_or(HistoryError::MissingCollaborator("event source"))?;
        let directory = self
            .directory
            .as_deref()
            .ok_or(HistoryError::MissingCollaborator("entity directory"))?;
        let no_schedule = MemoryScheduleSource::new();
        let schedule = self.schedule.as_deref().unwrap_or(&no_schedule);
        let calendar = self
            .calendar
            .clone()
            .unwrap_or_else(|| Arc::new(WeekdayCalendar::new()));

        TemporalResolutionContext::load(
            view,
            self.config.clone(),
            Sources {
                events,
                directory,
                schedule,
            },
            calendar,
        )
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
