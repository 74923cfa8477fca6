//! Super/sub membership history compiled from relationship frames.
//!
//! Every valid frame contributes a join and a leave event to both sides of
//! the relationship: the super's "members below" log and the sub's "members
//! above" log. Events are replayed per entity in time order and the running
//! membership set is recorded once per local day, at the end of that day.

use super::change_log::ChangeLog;
use crate::compute::temporal::Localizer;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use entity_history_types::entity::EntityId;
use entity_history_types::event::RelationshipFrame;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

pub type MemberSet = BTreeSet<EntityId>;

/// Which side of the hierarchy to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Subs belonging under a super.
    Below,
    /// Supers a sub belongs to.
    Above,
}

#[derive(Debug, Clone, Copy)]
struct MemberEvent {
    time: NaiveDateTime,
    member: EntityId,
    joined: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipHistory {
    below: FxHashMap<EntityId, ChangeLog<MemberSet>>,
    above: FxHashMap<EntityId, ChangeLog<MemberSet>>,
    supers: FxHashSet<EntityId>,
}

impl RelationshipHistory {
    /// Compile relationship frames into per-entity membership logs.
    ///
    /// Only frames whose sub is an account and whose super is not are kept;
    /// the rest are structurally invalid. Open frames end at `far_future`.
    pub fn build<F>(
        frames: &[RelationshipFrame],
        is_account: F,
        far_future: DateTime<Utc>,
        localizer: &Localizer,
    ) -> Result<Self>
    where
        F: Fn(EntityId) -> bool,
    {
        let mut valid: Vec<&RelationshipFrame> = frames
            .iter()
            .filter(|frame| is_account(frame.sub_id) && !is_account(frame.super_id))
            .collect();
        if valid.len() < frames.len() {
            log::warn!(
                "Dropped {} relationship frames with invalid super/sub kinds",
                frames.len() - valid.len()
            );
        }
        valid.sort_by_key(|frame| frame.start);

        let supers: FxHashSet<EntityId> = valid.iter().map(|frame| frame.super_id).collect();

        let mut events: FxHashMap<EntityId, Vec<MemberEvent>> = FxHashMap::default();
        for frame in valid {
            let end = frame.end.unwrap_or(far_future);
            for (owner, member) in [(frame.super_id, frame.sub_id), (frame.sub_id, frame.super_id)] {
                let list = events.entry(owner).or_default();
                list.push(MemberEvent {
                    time: localizer.localize(owner, frame.start)?,
                    member,
                    joined: true,
                });
                list.push(MemberEvent {
                    time: localizer.localize(owner, end)?,
                    member,
                    joined: false,
                });
            }
        }

        let mut history = Self {
            supers,
            ..Self::default()
        };

        for (entity, mut list) in events {
            list.sort_by_key(|event| event.time);
            let log = daily_membership(&list)?;
            if history.supers.contains(&entity) {
                history.below.insert(entity, log);
            } else {
                history.above.insert(entity, log);
            }
        }

        log::debug!(
            "Relationship history built: {} supers, {} subs",
            history.below.len(),
            history.above.len()
        );

        Ok(history)
    }

    /// Members in `direction` of `entity` on local `day`.
    ///
    /// Always returns an owned set; the stored log is never handed out. With
    /// `include_self` the entity itself is part of the result even when it has
    /// no recorded history.
    pub fn get_members(
        &self,
        direction: Direction,
        entity: EntityId,
        day: NaiveDate,
        include_self: bool,
    ) -> MemberSet {
        let logs = match direction {
            Direction::Below => &self.below,
            Direction::Above => &self.above,
        };

        let mut members = logs
            .get(&entity)
            .and_then(|log| log.value_at(day))
            .cloned()
            .unwrap_or_default();

        if include_self {
            members.insert(entity);
        }
        members
    }

    /// An entity is a super iff it is the super side of a valid frame.
    pub fn is_super(&self, entity: EntityId) -> bool {
        self.supers.contains(&entity)
    }

    pub fn supers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.supers.iter().copied()
    }

    pub fn log(&self, direction: Direction, entity: EntityId) -> Option<&ChangeLog<MemberSet>> {
        match direction {
            Direction::Below => self.below.get(&entity),
            Direction::Above => self.above.get(&entity),
        }
    }
}

/// End-of-day membership snapshots for one entity's time-ordered events.
fn daily_membership(events: &[MemberEvent]) -> Result<ChangeLog<MemberSet>> {
    let mut log = ChangeLog::new();
    let mut current = MemberSet::new();
    let mut iter = events.iter().peekable();

    while let Some(event) = iter.next() {
        if event.joined {
            current.insert(event.member);
        } else {
            current.remove(&event.member);
        }

        let day = event.time.date();
        let day_ends = iter.peek().is_none_or(|next| next.time.date() != day);
        if day_ends {
            log.push(day, current.clone())?;
        }
    }

    Ok(log)
}
