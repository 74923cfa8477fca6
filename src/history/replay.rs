//! Direct replay of raw change rows at arbitrary instants.
//!
//! These queries work from the raw rows rather than the compiled day logs:
//! for each requested instant every row strictly before it is applied in
//! time order. They are exact to the instant (no day bucketing or timezone
//! handling) and serve as a cross-check for the compiled histories.

use super::relationship::MemberSet;
use chrono::{DateTime, Utc};
use entity_history_types::entity::EntityId;
use entity_history_types::event::{ActivationEvent, RelationshipChange};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Subs of each super at each instant.
///
/// Every `(super, time)` pair is present in the result, empty when nothing
/// applies. With `filter`, only rows whose sub is in the filter are replayed.
pub fn sub_entities_at_times(
    changes: &[RelationshipChange],
    super_ids: &[EntityId],
    times: &[DateTime<Utc>],
    filter: Option<&FxHashSet<EntityId>>,
) -> BTreeMap<(EntityId, DateTime<Utc>), MemberSet> {
    let wanted: FxHashSet<EntityId> = super_ids.iter().copied().collect();
    let mut rows: Vec<&RelationshipChange> = changes
        .iter()
        .filter(|row| wanted.contains(&row.super_id))
        .filter(|row| filter.is_none_or(|f| f.contains(&row.sub_id)))
        .collect();
    rows.sort_by_key(|row| row.time);

    let mut running: BTreeMap<EntityId, MemberSet> = wanted
        .iter()
        .map(|id| (*id, MemberSet::new()))
        .collect();

    let mut out = BTreeMap::new();
    let mut cursor = 0;
    for time in sorted_unique(times) {
        while cursor < rows.len() && rows[cursor].time < time {
            let row = rows[cursor];
            let members = running.entry(row.super_id).or_default();
            if row.was_activated {
                members.insert(row.sub_id);
            } else {
                members.remove(&row.sub_id);
            }
            cursor += 1;
        }
        for (super_id, members) in &running {
            out.insert((*super_id, time), members.clone());
        }
    }
    out
}

/// Active entities at each instant.
pub fn entities_at_times(
    events: &[ActivationEvent],
    times: &[DateTime<Utc>],
    filter: Option<&FxHashSet<EntityId>>,
) -> BTreeMap<DateTime<Utc>, MemberSet> {
    let mut rows: Vec<&ActivationEvent> = events
        .iter()
        .filter(|event| filter.is_none_or(|f| f.contains(&event.entity_id)))
        .collect();
    rows.sort_by_key(|event| event.time);

    let mut active = MemberSet::new();
    let mut out = BTreeMap::new();
    let mut cursor = 0;
    for time in sorted_unique(times) {
        while cursor < rows.len() && rows[cursor].time < time {
            let event = rows[cursor];
            if event.is_active {
                active.insert(event.entity_id);
            } else {
                active.remove(&event.entity_id);
            }
            cursor += 1;
        }
        out.insert(time, active.clone());
    }
    out
}

fn sorted_unique(times: &[DateTime<Utc>]) -> Vec<DateTime<Utc>> {
    let mut sorted = times.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use entity_history_types::event::RelationshipFrame;

    fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2013, month, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_no_rows_no_input() {
        assert!(sub_entities_at_times(&[], &[], &[], None).is_empty());
        assert!(entities_at_times(&[], &[], None).is_empty());
    }

    #[test]
    fn test_no_rows_with_input_yields_empty_sets() {
        let times = [at(4, 5, 0), at(5, 6, 0)];
        let out = sub_entities_at_times(&[], &[EntityId(1), EntityId(2)], &times, None);
        assert_eq!(out.len(), 4);
        assert!(out.values().all(|members| members.is_empty()));
    }

    #[test]
    fn test_multiple_changes_one_sub() {
        let team = EntityId(10);
        let sub = EntityId(1);
        let mut changes = RelationshipFrame::new(team, sub, at(2, 1, 0), Some(at(2, 3, 0))).changes();
        changes.push(RelationshipChange {
            super_id: team,
            sub_id: sub,
            time: at(2, 4, 0),
            was_activated: false,
        });
        changes.extend(RelationshipFrame::new(team, sub, at(2, 4, 12), Some(at(3, 4, 12))).changes());

        let out = sub_entities_at_times(&changes, &[team], &[at(2, 6, 0), at(2, 2, 0), at(1, 1, 0)], None);
        assert_eq!(out[&(team, at(2, 6, 0))], MemberSet::from([sub]));
        assert_eq!(out[&(team, at(2, 2, 0))], MemberSet::from([sub]));
        assert!(out[&(team, at(1, 1, 0))].is_empty());
    }

    #[test]
    fn test_change_at_query_instant_is_not_applied() {
        let team = EntityId(10);
        let changes = RelationshipFrame::open(team, EntityId(1), at(2, 1, 0)).changes();
        let out = sub_entities_at_times(&changes, &[team], &[at(2, 1, 0)], None);
        assert!(out[&(team, at(2, 1, 0))].is_empty());
    }

    #[test]
    fn test_filter_limits_subs() {
        let team = EntityId(10);
        let mut changes = RelationshipFrame::open(team, EntityId(1), at(2, 1, 0)).changes();
        changes.extend(RelationshipFrame::open(team, EntityId(2), at(2, 1, 0)).changes());
        let filter: FxHashSet<EntityId> = [EntityId(2)].into_iter().collect();

        let out = sub_entities_at_times(&changes, &[team], &[at(3, 1, 0)], Some(&filter));
        assert_eq!(out[&(team, at(3, 1, 0))], MemberSet::from([EntityId(2)]));
    }

    #[test]
    fn test_entities_at_times() {
        let events = [
            ActivationEvent::new(EntityId(1), at(2, 1, 0), true),
            ActivationEvent::new(EntityId(2), at(2, 1, 0), true),
            ActivationEvent::new(EntityId(1), at(2, 3, 0), false),
        ];

        let out = entities_at_times(&events, &[at(2, 2, 0), at(2, 4, 0), at(1, 1, 0)], None);
        assert_eq!(out[&at(2, 2, 0)], MemberSet::from([EntityId(1), EntityId(2)]));
        assert_eq!(out[&at(2, 4, 0)], MemberSet::from([EntityId(2)]));
        assert!(out[&at(1, 1, 0)].is_empty());

        let filter: FxHashSet<EntityId> = [EntityId(1)].into_iter().collect();
        let out = entities_at_times(&events, &[at(2, 2, 0)], Some(&filter));
        assert_eq!(out[&at(2, 2, 0)], MemberSet::from([EntityId(1)]));
    }
}
