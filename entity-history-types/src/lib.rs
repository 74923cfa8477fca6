//! # entity-history-types
//!
//! Core data types shared by the `entity-history` resolution engine and its
//! collaborators:
//!
//! - **Identity types**: `EntityId`, `SnapshotId`, `SnapshotView`
//! - **Event types**: `ActivationEvent`, `ActivationFrame`, `RelationshipFrame`,
//!   `RelationshipChange`, `RefCount`
//! - **Period types**: `TimeGroup`, `EntityDays`
//!
//! All types are serializable with Serde. Instants are UTC (`DateTime<Utc>`);
//! day-bucketed values use `NaiveDate` in the owning entity's local zone.
//!
//! ## Examples
//!
//! ```rust
//! use entity_history_types::event::ActivationFrame;
//! use entity_history_types::entity::EntityId;
//! use chrono::{TimeZone, Utc};
//!
//! let frame = ActivationFrame::open(EntityId(7), Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
//! assert!(frame.end.is_none());
//! ```

pub mod entity;
pub mod event;
pub mod period;
