use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Granularity handle used to bucket days into longer reporting periods.
///
/// The handle is opaque to the resolution engine: a `PeriodClock` decides
/// where each period starts and ends. Entity-days for any period are the sum
/// of the underlying days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGroup {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeGroup {
    pub fn name(&self) -> &'static str {
        match self {
            TimeGroup::Day => "day",
            TimeGroup::Week => "week",
            TimeGroup::Month => "month",
            TimeGroup::Quarter => "quarter",
            TimeGroup::Year => "year",
        }
    }
}

/// Entity-day counts over an inclusive window.
///
/// - `raw`: active members counted every day
/// - `absolute`: active members counted on work days only
/// - `adjusted`: like `absolute`, minus members individually scheduled off
///
/// For any window `adjusted <= absolute <= raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityDays {
    pub raw: u64,
    pub absolute: u64,
    pub adjusted: u64,
}

impl EntityDays {
    pub fn new(raw: u64, absolute: u64, adjusted: u64) -> Self {
        Self {
            raw,
            absolute,
            adjusted,
        }
    }
}

impl Add for EntityDays {
    type Output = EntityDays;

    fn add(self, rhs: Self) -> Self::Output {
        EntityDays::new(
            self.raw + rhs.raw,
            self.absolute + rhs.absolute,
            self.adjusted + rhs.adjusted,
        )
    }
}

impl AddAssign for EntityDays {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
