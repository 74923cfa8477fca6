//! Period bucketing for reporting granularities longer than a day.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use entity_history_types::period::TimeGroup;

/// Floors days to period boundaries for an opaque granularity handle.
pub trait PeriodClock: Send + Sync {
    /// First day of the period containing `day`.
    fn floor(&self, group: TimeGroup, day: NaiveDate) -> NaiveDate;

    /// Last day (inclusive) of the period starting at `start`.
    fn period_end(&self, group: TimeGroup, start: NaiveDate) -> NaiveDate;
}

/// Gregorian calendar periods with a configurable first weekday.
#[derive(Debug, Clone, Copy)]
pub struct CalendarClock {
    week_start: Weekday,
}

impl CalendarClock {
    pub fn new(week_start: Weekday) -> Self {
        Self { week_start }
    }
}

impl Default for CalendarClock {
    fn default() -> Self {
        Self::new(Weekday::Mon)
    }
}

impl PeriodClock for CalendarClock {
    fn floor(&self, group: TimeGroup, day: NaiveDate) -> NaiveDate {
        match group {
            TimeGroup::Day => day,
            TimeGroup::Week => {
                let back = (7 + day.weekday().num_days_from_monday()
                    - self.week_start.num_days_from_monday())
                    % 7;
                day - Duration::days(i64::from(back))
            }
            TimeGroup::Month => day.with_day(1).unwrap_or(day),
            TimeGroup::Quarter => {
                let month = (day.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(day.year(), month, 1).unwrap_or(day)
            }
            TimeGroup::Year => NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day),
        }
    }

    fn period_end(&self, group: TimeGroup, start: NaiveDate) -> NaiveDate {
        let next = match group {
            TimeGroup::Day => start.succ_opt(),
            TimeGroup::Week => start.checked_add_signed(Duration::days(7)),
            TimeGroup::Month => add_months(start, 1),
            TimeGroup::Quarter => add_months(start, 3),
            TimeGroup::Year => add_months(start, 12),
        };
        next.and_then(|d| d.pred_opt()).unwrap_or(start)
    }
}

fn add_months(day: NaiveDate, months: u32) -> Option<NaiveDate> {
    day.checked_add_months(chrono::Months::new(months))
}
