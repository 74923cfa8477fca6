//! Temporal computation primitives.
//!
//! - `fill_forward`: sorted-time lookup of the value effective at a query time
//! - `localize`: UTC to entity-local conversion and day bucketing
//! - `period`: flooring days to longer reporting periods

pub mod fill_forward;
pub mod localize;
pub mod period;

pub use fill_forward::{check_sorted, fill_forward, fill_forward_indexes, find_lower_edge};
pub use localize::{Localizer, floor_day};
pub use period::{CalendarClock, PeriodClock};
