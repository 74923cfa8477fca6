//! Day-bucketed, ascending change log for a single entity.

use crate::compute::temporal::find_lower_edge;
use crate::error::{HistoryError, Result};
use chrono::NaiveDate;

/// Ascending `(day, value)` records; days strictly increase.
///
/// Lookups fill forward: the value effective on a day is the one recorded on
/// the latest day at or before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLog<V> {
    days: Vec<NaiveDate>,
    values: Vec<V>,
}

impl<V> ChangeLog<V> {
    pub fn new() -> Self {
        Self {
            days: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append a record. `day` must be after every recorded day.
    pub fn push(&mut self, day: NaiveDate, value: V) -> Result<()> {
        if let Some(last) = self.days.last()
            && *last >= day
        {
            return Err(HistoryError::Unsorted {
                context: format!("change log day {} after {}", day, last),
            });
        }
        self.days.push(day);
        self.values.push(value);
        Ok(())
    }

    /// Value effective on `day`, or `None` before the first record.
    pub fn value_at(&self, day: NaiveDate) -> Option<&V> {
        find_lower_edge(&self.days, &day).map(|idx| &self.values[idx])
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &V)> {
        self.days.iter().copied().zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<V> Default for ChangeLog<V> {
    fn default() -> Self {
        Self::new()
    }
}
