//! Compiled per-entity histories.
//!
//! Raw change events are compiled once per context into ascending day-level
//! change logs. After the build every structure here is read-only.

pub mod activation;
pub mod change_log;
pub mod relationship;
pub mod replay;
pub mod schedule;

pub use activation::ActivationHistory;
pub use change_log::ChangeLog;
pub use relationship::{Direction, MemberSet, RelationshipHistory};
pub use schedule::ScheduleHistory;
