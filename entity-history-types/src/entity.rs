use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an entity (individual, team, role, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Identity of a frozen, point-in-time view of the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snapshot:{}", self.0)
    }
}

/// Which view of the event store a resolution context observes.
///
/// `Live` always sees the current event set. `At` sees the event set as it
/// was frozen under the given snapshot identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotView {
    #[default]
    Live,
    At(SnapshotId),
}

impl SnapshotView {
    pub fn is_live(&self) -> bool {
        matches!(self, SnapshotView::Live)
    }

    pub fn snapshot_id(&self) -> Option<SnapshotId> {
        match self {
            SnapshotView::Live => None,
            SnapshotView::At(id) => Some(*id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display_and_order() {
        assert_eq!(EntityId(3).to_string(), "entity:3");
        assert!(EntityId(1) < EntityId(2));
        assert_eq!(EntityId::from(9), EntityId(9));
    }

    #[test]
    fn test_snapshot_view() {
        assert!(SnapshotView::default().is_live());
        let view = SnapshotView::At(SnapshotId(4));
        assert!(!view.is_live());
        assert_eq!(view.snapshot_id(), Some(SnapshotId(4)));
    }
}
