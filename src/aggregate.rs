//! Entity-day aggregation over cumulative per-day tables.
//!
//! For every day in a window three running totals are kept:
//!
//! - raw: active subs of the entity that day (the entity itself when it is
//!   not a super)
//! - absolute: the raw count, added only on days the entity counts as a work day
//! - adjusted: on those days, only subs that are not scheduled off
//!
//! The interval count for `[start, end]` is `table[end] - table[start - 1]`.
//! Tables are built on first use and cached per `(entity, min, max)` for the
//! lifetime of the aggregator.

use crate::error::{HistoryError, Result};
use crate::history::MemberSet;
use chrono::{Days, Duration, NaiveDate};
use dashmap::DashMap;
use entity_history_types::entity::EntityId;
use entity_history_types::period::EntityDays;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Day-level facts the aggregator needs about entities.
pub trait DaySource {
    fn is_super_entity(&self, entity: EntityId) -> bool;

    fn members_below(&self, entity: EntityId, day: NaiveDate, include_self: bool) -> MemberSet;

    fn is_active_on(&self, entity: EntityId, day: NaiveDate) -> bool;

    /// Whether the day adds to the entity's absolute count.
    fn counts_as_work_day(&self, entity: EntityId, day: NaiveDate) -> bool;

    fn scheduled_day_off(&self, entity: EntityId, day: NaiveDate) -> bool;
}

/// Running entity-day totals for one entity over `[min, max]`, seeded with
/// zero on the day before `min`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeDayTable {
    seed_day: NaiveDate,
    raw: Vec<u64>,
    absolute: Vec<u64>,
    adjusted: Vec<u64>,
}

impl CumulativeDayTable {
    pub fn build<D>(source: &D, entity: EntityId, min: NaiveDate, max: NaiveDate) -> Result<Self>
    where
        D: DaySource + ?Sized,
    {
        let seed_day = min
            .pred_opt()
            .ok_or(HistoryError::WindowOutOfRange { entity, day: min })?;

        let span = usize::try_from((max - min).num_days() + 1).unwrap_or(0);
        let mut table = Self {
            seed_day,
            raw: Vec::with_capacity(span + 1),
            absolute: Vec::with_capacity(span + 1),
            adjusted: Vec::with_capacity(span + 1),
        };
        table.raw.push(0);
        table.absolute.push(0);
        table.adjusted.push(0);

        let include_self = !source.is_super_entity(entity);
        let mut totals = EntityDays::default();

        for day in min.iter_days().take_while(|day| *day <= max) {
            let subs: Vec<EntityId> = source
                .members_below(entity, day, include_self)
                .into_iter()
                .filter(|sub| source.is_active_on(*sub, day))
                .collect();

            totals.raw += subs.len() as u64;
            if source.counts_as_work_day(entity, day) {
                totals.absolute += subs.len() as u64;
                totals.adjusted += subs
                    .iter()
                    .filter(|sub| !source.scheduled_day_off(**sub, day))
                    .count() as u64;
            }

            table.raw.push(totals.raw);
            table.absolute.push(totals.absolute);
            table.adjusted.push(totals.adjusted);
        }

        Ok(table)
    }

    /// Day before the window; its totals are all zero.
    pub fn seed_day(&self) -> NaiveDate {
        self.seed_day
    }

    /// Last day covered; the seed day for an empty table.
    pub fn last_day(&self) -> NaiveDate {
        self.seed_day
            .checked_add_days(Days::new(self.len() as u64))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Totals accumulated through `day`, if the table covers it.
    pub fn at(&self, day: NaiveDate) -> Option<EntityDays> {
        let offset = usize::try_from((day - self.seed_day).num_days()).ok()?;
        Some(EntityDays::new(
            *self.raw.get(offset)?,
            *self.absolute.get(offset)?,
            *self.adjusted.get(offset)?,
        ))
    }

    /// Number of days covered, excluding the seed day.
    pub fn len(&self) -> usize {
        self.raw.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type WindowKey = (EntityId, NaiveDate, NaiveDate);

/// Memoizing entity-day calculator. One per resolution context.
#[derive(Debug)]
pub struct EntityDayAggregator {
    tables: DashMap<WindowKey, Arc<OnceCell<Arc<CumulativeDayTable>>>>,
    lead_days: i64,
    tail_days: i64,
}

impl EntityDayAggregator {
    /// `lead_days`/`tail_days` pad the window when the caller gives no bounds.
    pub fn new(lead_days: u32, tail_days: u32) -> Self {
        Self {
            tables: DashMap::new(),
            lead_days: i64::from(lead_days),
            tail_days: i64::from(tail_days),
        }
    }

    /// Cumulative table for `entity` over `[min, max]`, built once per key.
    pub fn cumulative_table<D>(
        &self,
        source: &D,
        entity: EntityId,
        min: NaiveDate,
        max: NaiveDate,
    ) -> Result<Arc<CumulativeDayTable>>
    where
        D: DaySource + ?Sized,
    {
        let cell = self.tables.entry((entity, min, max)).or_default().clone();
        cell.get_or_try_init(|| {
            log::debug!("Building cumulative day table for {} over {}..={}", entity, min, max);
            CumulativeDayTable::build(source, entity, min, max).map(Arc::new)
        })
        .cloned()
    }

    /// Entity-days for `entity` over the inclusive range `[start, end]`.
    ///
    /// The cached window is `[min, max]`, defaulting to the range padded by the
    /// configured lead and tail days. Reuse across calls only happens when the
    /// same bounds are passed, so callers computing many sub-ranges should pass
    /// a window covering all of them.
    pub fn get_entity_days<D>(
        &self,
        source: &D,
        entity: EntityId,
        start: NaiveDate,
        end: NaiveDate,
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    ) -> Result<EntityDays>
    where
        D: DaySource + ?Sized,
    {
        let min = match min {
            Some(day) => day,
            None => shift(entity, start, -self.lead_days)?,
        };
        let max = match max {
            Some(day) => day,
            None => shift(entity, end, self.tail_days)?,
        };

        let before_start = start
            .pred_opt()
            .ok_or(HistoryError::WindowOutOfRange { entity, day: start })?;
        let table = self.cumulative_table(source, entity, min, max)?;
        let lookup = |day| table.at(day).ok_or(HistoryError::WindowOutOfRange { entity, day });
        let through_end = lookup(end)?;
        let through_before = lookup(before_start)?;

        Ok(EntityDays::new(
            through_end.raw.saturating_sub(through_before.raw),
            through_end.absolute.saturating_sub(through_before.absolute),
            through_end.adjusted.saturating_sub(through_before.adjusted),
        ))
    }

    /// Number of cached windows.
    pub fn cached_tables(&self) -> usize {
        self.tables.len()
    }
}

impl Default for EntityDayAggregator {
    fn default() -> Self {
        Self::new(1, 2)
    }
}

fn shift(entity: EntityId, day: NaiveDate, days: i64) -> Result<NaiveDate> {
    day.checked_add_signed(Duration::days(days))
        .ok_or(HistoryError::WindowOutOfRange { entity, day })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};
    use rustc_hash::FxHashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEAM: EntityId = EntityId(100);
    const ANN: EntityId = EntityId(1);
    const BOB: EntityId = EntityId(2);

    fn d(day: u32) -> NaiveDate {
        // January 2024 starts on a Monday
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    /// A team of two, Bob off on the 3rd, nobody works weekends.
    struct FixedTeam {
        member_calls: AtomicUsize,
        inactive: FxHashSet<EntityId>,
    }

    impl FixedTeam {
        fn new() -> Self {
            Self {
                member_calls: AtomicUsize::new(0),
                inactive: FxHashSet::default(),
            }
        }
    }

    impl DaySource for FixedTeam {
        fn is_super_entity(&self, entity: EntityId) -> bool {
            entity == TEAM
        }

        fn members_below(&self, entity: EntityId, _day: NaiveDate, include_self: bool) -> MemberSet {
            self.member_calls.fetch_add(1, Ordering::SeqCst);
            let mut members = if entity == TEAM {
                MemberSet::from([ANN, BOB])
            } else {
                MemberSet::new()
            };
            if include_self {
                members.insert(entity);
            }
            members
        }

        fn is_active_on(&self, entity: EntityId, _day: NaiveDate) -> bool {
            !self.inactive.contains(&entity)
        }

        fn counts_as_work_day(&self, _entity: EntityId, day: NaiveDate) -> bool {
            !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
        }

        fn scheduled_day_off(&self, entity: EntityId, day: NaiveDate) -> bool {
            entity == BOB && day == d(3)
        }
    }

    #[test]
    fn test_team_week() {
        let source = FixedTeam::new();
        let aggregator = EntityDayAggregator::default();

        let days = aggregator
            .get_entity_days(&source, TEAM, d(1), d(7), None, None)
            .unwrap();
        assert_eq!(days, EntityDays::new(14, 10, 9));
    }

    #[test]
    fn test_individual_counts_self() {
        let source = FixedTeam::new();
        let aggregator = EntityDayAggregator::default();

        let bob = aggregator
            .get_entity_days(&source, BOB, d(1), d(7), None, None)
            .unwrap();
        assert_eq!(bob, EntityDays::new(7, 5, 4));
    }

    #[test]
    fn test_inactive_subs_not_counted() {
        let mut source = FixedTeam::new();
        source.inactive.insert(ANN);
        let aggregator = EntityDayAggregator::default();

        let days = aggregator
            .get_entity_days(&source, TEAM, d(1), d(1), None, None)
            .unwrap();
        assert_eq!(days, EntityDays::new(1, 1, 1));
    }

    #[test]
    fn test_interval_equals_sum_of_days() {
        let source = FixedTeam::new();
        let aggregator = EntityDayAggregator::default();
        let (min, max) = (Some(d(1)), Some(d(20)));

        let whole = aggregator
            .get_entity_days(&source, TEAM, d(2), d(16), min, max)
            .unwrap();
        let mut summed = EntityDays::default();
        for day in 2..=16 {
            summed += aggregator
                .get_entity_days(&source, TEAM, d(day), d(day), min, max)
                .unwrap();
        }
        assert_eq!(whole, summed);
        assert_eq!(aggregator.cached_tables(), 1);
    }

    #[test]
    fn test_table_built_once_per_window() {
        let source = FixedTeam::new();
        let aggregator = EntityDayAggregator::default();

        for _ in 0..3 {
            aggregator
                .get_entity_days(&source, TEAM, d(5), d(8), Some(d(1)), Some(d(10)))
                .unwrap();
        }
        assert_eq!(source.member_calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_query_outside_window_is_error() {
        let source = FixedTeam::new();
        let aggregator = EntityDayAggregator::default();

        let err = aggregator
            .get_entity_days(&source, TEAM, d(5), d(15), Some(d(1)), Some(d(10)))
            .unwrap_err();
        assert!(matches!(
            err,
            HistoryError::WindowOutOfRange { day, .. } if day == d(15)
        ));
    }

    #[test]
    fn test_table_bounds() {
        let source = FixedTeam::new();
        let table = CumulativeDayTable::build(&source, TEAM, d(2), d(4)).unwrap();

        assert_eq!(table.seed_day(), d(1));
        assert_eq!(table.last_day(), d(4));
        assert_eq!(table.len(), 3);
        assert_eq!(table.at(d(1)), Some(EntityDays::default()));
        assert!(table.at(d(5)).is_none());
        assert!(table.at(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()).is_none());
    }

    #[test]
    fn test_empty_window_ends_on_seed_day() {
        let source = FixedTeam::new();
        let table = CumulativeDayTable::build(&source, TEAM, d(4), d(2)).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.last_day(), table.seed_day());
        assert_eq!(table.at(d(3)), Some(EntityDays::default()));
    }
}
