//! Temporal resolution engine for entity activation and membership history.
//!
//! Raw activation and super/sub relationship events are compiled into
//! per-entity, day-bucketed change logs, localized to each entity's zone.
//! Point-in-time questions (is this entity active, who belongs to this team)
//! are answered by fill-forward lookup over those logs, and entity-day counts
//! are aggregated over cached cumulative tables.
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use entity_history::prelude::*;
//! use std::sync::Arc;
//!
//! let team = EntityId(100);
//! let ann = EntityId(1);
//! let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
//!
//! let directory = Arc::new(MemoryDirectory::new());
//! directory.add_group(team);
//! directory.add_account(ann);
//!
//! let events = Arc::new(MemoryEventSource::new());
//! events.record_activation(ActivationEvent::new(team, start, true));
//! events.record_activation(ActivationEvent::new(ann, start, true));
//! events.record_relationship(RelationshipFrame::open(team, ann, start));
//!
//! let context = StateBuilder::new()
//!     .event_source(events)
//!     .directory(directory)
//!     .build_context()?;
//!
//! let jan = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! assert!(context.get_subs_on(team, jan(2), false).contains(&ann));
//!
//! let week = context.get_entity_days(team, jan(1), jan(7), None, None)?;
//! assert_eq!((week.raw, week.absolute), (7, 5));
//! # Ok::<(), entity_history::HistoryError>(())
//! ```

pub mod aggregate;
pub mod builder;
pub mod compute;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod snapshot;
pub mod source;

pub use aggregate::{CumulativeDayTable, DaySource, EntityDayAggregator};
pub use builder::StateBuilder;
pub use config::Config;
pub use context::{EntityState, Sources, StashKey, StashValue, TemporalResolutionContext};
pub use error::{HistoryError, Result};

pub use compute::temporal::{CalendarClock, Localizer, PeriodClock, fill_forward_indexes, find_lower_edge};

pub use history::{ActivationHistory, ChangeLog, Direction, MemberSet, RelationshipHistory, ScheduleHistory};

pub use snapshot::{ActivationSnapshot, ActivationSnapshots, MemorySnapshotStore, SnapshotRecord, SnapshotStore};
#[cfg(feature = "snapshot")]
pub use snapshot::SnapshotFile;

pub use source::{
    EntityDirectory, EventSource, MemoryDirectory, MemoryEventSource, MemoryScheduleSource,
    ScheduleSource, WeekdayCalendar, WorkCalendar,
};

pub use entity_history_types::entity::{EntityId, SnapshotId, SnapshotView};
pub use entity_history_types::event::{
    ActivationEvent, ActivationFrame, RefCount, RelationshipChange, RelationshipFrame,
};
pub use entity_history_types::period::{EntityDays, TimeGroup};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Config, EntityState, HistoryError, Result, StateBuilder, TemporalResolutionContext};

    pub use crate::{ActivationSnapshots, Direction, MemberSet};

    pub use crate::{MemoryDirectory, MemoryEventSource, MemoryScheduleSource, WeekdayCalendar};

    pub use crate::{EntityDirectory, EventSource, ScheduleSource, WorkCalendar};

    pub use crate::{
        ActivationEvent, ActivationFrame, EntityDays, EntityId, RefCount, RelationshipFrame,
        SnapshotId, SnapshotView, TimeGroup,
    };
}
