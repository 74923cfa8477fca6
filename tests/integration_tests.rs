use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use entity_history::prelude::*;
use entity_history::{CalendarClock, EntityDays, StashValue, fill_forward_indexes, find_lower_edge};
use std::sync::Arc;
use std::thread;

const TEAM: EntityId = EntityId(100);
const ANN: EntityId = EntityId(1);
const BOB: EntityId = EntityId(2);
const CY: EntityId = EntityId(3);

fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, hour, 0, 0).unwrap()
}

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

struct World {
    events: Arc<MemoryEventSource>,
    directory: Arc<MemoryDirectory>,
    schedule: Arc<MemoryScheduleSource>,
}

impl World {
    fn new() -> Self {
        let world = Self {
            events: Arc::new(MemoryEventSource::new()),
            directory: Arc::new(MemoryDirectory::new()),
            schedule: Arc::new(MemoryScheduleSource::new()),
        };
        world.directory.add_group(TEAM);
        for account in [ANN, BOB, CY] {
            world.directory.add_account(account);
        }
        world
    }

    fn activate(&self, entity: EntityId, time: DateTime<Utc>, is_active: bool) {
        self.events
            .record_activation(ActivationEvent::new(entity, time, is_active));
    }

    fn builder(&self) -> StateBuilder {
        StateBuilder::new()
            .event_source(self.events.clone())
            .directory(self.directory.clone())
            .schedule_source(self.schedule.clone())
    }

    fn context(&self) -> TemporalResolutionContext {
        self.builder().build_context().unwrap()
    }
}

#[test]
fn test_activation_scenario() {
    let world = World::new();
    world.activate(ANN, at(1, 1, 9), true);
    world.activate(ANN, at(1, 10, 9), false);
    let context = world.context();

    assert!(context.is_active(ANN, at(1, 5, 12)).unwrap());
    assert!(!context.is_active(ANN, at(1, 15, 12)).unwrap());
}

#[test]
fn test_open_activation_frame_uses_far_future() {
    let world = World::new();
    let config = Config::default();
    for event in ActivationFrame::open(ANN, at(1, 1, 9)).events(config.far_future()) {
        world.events.record_activation(event);
    }
    let context = world.context();

    assert!(context.is_active(ANN, at(12, 31, 0)).unwrap());
    assert!(context.is_active_on(ANN, NaiveDate::from_ymd_opt(9000, 1, 1).unwrap()));
}

#[test]
fn test_activation_is_constant_between_changes() {
    let world = World::new();
    world.activate(ANN, at(1, 3, 0), true);
    world.activate(ANN, at(1, 8, 0), false);
    world.activate(ANN, at(1, 20, 0), true);
    let context = world.context();

    let mut t = at(1, 8, 0);
    while t < at(1, 20, 0) {
        assert!(!context.is_active(ANN, t).unwrap(), "{}", t);
        t += Duration::hours(5);
    }
    let mut t = at(1, 3, 0);
    while t < at(1, 8, 0) {
        assert!(context.is_active(ANN, t).unwrap(), "{}", t);
        t += Duration::hours(5);
    }
}

#[test]
fn test_membership_scenario() {
    let world = World::new();
    world
        .events
        .record_relationship(RelationshipFrame::new(TEAM, CY, at(1, 2, 9), Some(at(1, 4, 9))));
    let context = world.context();

    assert_eq!(context.get_subs(TEAM, at(1, 3, 9), false).unwrap(), MemberSet::from([CY]));
    assert!(context.get_subs(TEAM, at(1, 5, 9), false).unwrap().is_empty());
    assert_eq!(context.get_supers(CY, at(1, 3, 9), false).unwrap(), MemberSet::from([TEAM]));
}

#[test]
fn test_same_day_add_and_remove_records_removal() {
    let world = World::new();
    world
        .events
        .record_relationship(RelationshipFrame::new(TEAM, CY, at(1, 2, 9), Some(at(1, 2, 17))));
    let context = world.context();

    for day in 2..=30 {
        assert!(context.get_subs_on(TEAM, d(1, day), false).is_empty());
    }
}

#[test]
fn test_include_self_always_contains_entity() {
    let world = World::new();
    world
        .events
        .record_relationship(RelationshipFrame::new(TEAM, ANN, at(1, 5, 0), Some(at(1, 9, 0))));
    let context = world.context();

    for day in 1..=15 {
        assert!(context.get_subs_on(TEAM, d(1, day), true).contains(&TEAM));
        assert!(!context.get_subs_on(TEAM, d(1, day), false).contains(&TEAM));
        assert!(context.get_supers_on(ANN, d(1, day), true).contains(&ANN));
    }
}

#[test]
fn test_fill_forward_property() {
    let table = [d(1, 2), d(1, 5), d(1, 5), d(1, 9)];
    let queries: Vec<NaiveDate> = (1..=12).map(|day| d(1, day)).collect();

    let batch = fill_forward_indexes(&queries, &table).unwrap();
    for (q, idx) in queries.iter().zip(&batch) {
        assert_eq!(*idx, find_lower_edge(&table, q));
        match idx {
            None => assert!(*q < table[0]),
            Some(i) => {
                assert!(table[*i] <= *q);
                if let Some(next) = table.get(i + 1) {
                    assert!(*q < *next);
                }
            }
        }
    }
    // ties resolve to the last registered entry
    assert_eq!(find_lower_edge(&table, &d(1, 6)), Some(2));
}

#[test]
fn test_snapshot_round_trip() {
    let world = World::new();
    let population: Vec<EntityId> = (1..=40).map(EntityId).collect();
    for id in &population {
        world.directory.add_account(*id);
        world.directory.set_active(*id, id.0 % 3 != 0);
    }

    let mut snapshots = ActivationSnapshots::in_memory();
    let x = at(3, 1, 0);
    snapshots.take_snapshot(world.directory.as_ref(), x).unwrap();

    let flags = snapshots.is_active_at(&[x], &population).unwrap();
    for (id, flag) in population.iter().zip(&flags[0]) {
        assert_eq!(*flag, id.0 % 3 != 0, "{}", id);
    }
    // before the first snapshot nothing is active
    let before = snapshots.entity_activity(x - Duration::seconds(1), &population).unwrap();
    assert!(before.iter().all(|flag| !flag));
}

fn team_world() -> World {
    let world = World::new();
    for entity in [TEAM, ANN, BOB, CY] {
        world.activate(entity, at(1, 1, 0), true);
    }
    world.activate(CY, at(1, 12, 0), false);
    world
        .events
        .record_relationship(RelationshipFrame::open(TEAM, ANN, at(1, 1, 0)));
    world
        .events
        .record_relationship(RelationshipFrame::new(TEAM, BOB, at(1, 1, 0), Some(at(1, 20, 0))));
    world
        .events
        .record_relationship(RelationshipFrame::open(TEAM, CY, at(1, 8, 0)));
    world.schedule.record(RefCount::new(ANN, d(1, 10), 1));
    world.schedule.record(RefCount::new(ANN, d(1, 12), 0));
    world.schedule.record(RefCount::new(BOB, d(1, 17), 2));
    world
}

#[test]
fn test_entity_day_ordering_holds() {
    let context = team_world().context();
    let (min, max) = (Some(d(1, 1)), Some(d(1, 31)));

    for start in 1..=28 {
        for len in [0, 1, 6] {
            let end = start + len;
            if end > 30 {
                continue;
            }
            for entity in [TEAM, ANN, BOB, CY] {
                let days = context
                    .get_entity_days(entity, d(1, start), d(1, end), min, max)
                    .unwrap();
                assert!(days.adjusted <= days.absolute, "{} {:?}", entity, days);
                assert!(days.absolute <= days.raw, "{} {:?}", entity, days);
            }
        }
    }
}

#[test]
fn test_interval_is_sum_of_days() {
    let context = team_world().context();
    let (min, max) = (Some(d(1, 1)), Some(d(1, 31)));

    let whole = context
        .get_entity_days(TEAM, d(1, 3), d(1, 25), min, max)
        .unwrap();
    let mut summed = EntityDays::default();
    for day in 3..=25 {
        summed += context
            .get_entity_days(TEAM, d(1, day), d(1, day), min, max)
            .unwrap();
    }
    assert_eq!(whole, summed);
}

#[test]
fn test_team_entity_days() {
    let context = team_world().context();

    // Mon 8th .. Sun 14th: Ann, Bob all week; Cy joins the 8th, inactive from the 12th.
    let week = context
        .get_entity_days(TEAM, d(1, 8), d(1, 14), None, None)
        .unwrap();
    assert_eq!(week.raw, 7 + 7 + 4);
    assert_eq!(week.absolute, 5 + 5 + 4);
    // Ann off the 10th and 11th.
    assert_eq!(week.adjusted, 14 - 2);
}

#[test]
fn test_stash_against_live() {
    let world = team_world();
    world.events.freeze(SnapshotId(1));
    // Bob's deactivation lands after the snapshot was frozen
    world.activate(BOB, at(1, 1, 0), false);

    let state = world
        .builder()
        .view(SnapshotView::At(SnapshotId(1)))
        .clock(Arc::new(CalendarClock::default()))
        .build_state()
        .unwrap();

    let expected = StashValue {
        raw_entity_days: 14,
        entity_days: 10,
        current_raw_entity_days: 7,
        current_entity_days: 5,
    };
    for adjusted in [true, false] {
        let value = state
            .stashed_entity_days(TEAM, TimeGroup::Week, d(1, 3), adjusted)
            .unwrap();
        assert_eq!(value, expected);
    }
}

#[test]
fn test_context_shared_across_threads() {
    let context = Arc::new(team_world().context());
    let expected = context
        .get_entity_days(TEAM, d(1, 1), d(1, 31), None, None)
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let context = Arc::clone(&context);
            thread::spawn(move || {
                let days = context
                    .get_entity_days(TEAM, d(1, 1), d(1, 31), None, None)
                    .unwrap();
                let subs = context.get_subs_on(TEAM, d(1, 1 + i), false);
                (days, subs.contains(&ANN))
            })
        })
        .collect();

    for handle in handles {
        let (days, has_ann) = handle.join().unwrap();
        assert_eq!(days, expected);
        assert!(has_ann);
    }
    assert_eq!(context.aggregator().cached_tables(), 1);
}
