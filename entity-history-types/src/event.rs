use crate::entity::EntityId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single activation flip: `entity_id` became active (or inactive) at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationEvent {
    pub entity_id: EntityId,
    pub time: DateTime<Utc>,
    pub is_active: bool,
}

impl ActivationEvent {
    pub fn new(entity_id: EntityId, time: DateTime<Utc>, is_active: bool) -> Self {
        Self {
            entity_id,
            time,
            is_active,
        }
    }
}

/// A span during which an entity was active.
///
/// An open frame (`end == None`) is still active. Consumers that need a
/// concrete end instant substitute a large-but-finite "far future" bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationFrame {
    pub entity_id: EntityId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl ActivationFrame {
    pub fn new(entity_id: EntityId, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            entity_id,
            start,
            end,
        }
    }

    /// A frame that has not ended yet.
    pub fn open(entity_id: EntityId, start: DateTime<Utc>) -> Self {
        Self::new(entity_id, start, None)
    }

    /// Expand into an activation at `start` and a deactivation at `end`
    /// (or at `far_future` when the frame is open).
    pub fn events(&self, far_future: DateTime<Utc>) -> [ActivationEvent; 2] {
        [
            ActivationEvent::new(self.entity_id, self.start, true),
            ActivationEvent::new(self.entity_id, self.end.unwrap_or(far_future), false),
        ]
    }
}

/// A span during which `sub_id` belonged under `super_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipFrame {
    pub super_id: EntityId,
    pub sub_id: EntityId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl RelationshipFrame {
    pub fn new(
        super_id: EntityId,
        sub_id: EntityId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            super_id,
            sub_id,
            start,
            end,
        }
    }

    pub fn open(super_id: EntityId, sub_id: EntityId, start: DateTime<Utc>) -> Self {
        Self::new(super_id, sub_id, start, None)
    }

    /// Raw change rows for this frame. An open frame yields only the activation.
    pub fn changes(&self) -> Vec<RelationshipChange> {
        let mut out = vec![RelationshipChange {
            super_id: self.super_id,
            sub_id: self.sub_id,
            time: self.start,
            was_activated: true,
        }];
        if let Some(end) = self.end {
            out.push(RelationshipChange {
                super_id: self.super_id,
                sub_id: self.sub_id,
                time: end,
                was_activated: false,
            });
        }
        out
    }
}

/// A raw relationship change row, as recorded by the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipChange {
    pub super_id: EntityId,
    pub sub_id: EntityId,
    pub time: DateTime<Utc>,
    pub was_activated: bool,
}

/// Day-off reference count for one entity, effective from `day` onward.
///
/// A non-zero count means the entity is scheduled off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCount {
    pub entity_id: EntityId,
    pub day: NaiveDate,
    pub ref_count: u32,
}

impl RefCount {
    pub fn new(entity_id: EntityId, day: NaiveDate, ref_count: u32) -> Self {
        Self {
            entity_id,
            day,
            ref_count,
        }
    }
}
