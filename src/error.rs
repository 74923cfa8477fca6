//! Error types for entity history resolution.

use chrono::{NaiveDate, NaiveDateTime};
use entity_history_types::entity::{EntityId, SnapshotId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// Fill-forward was asked to resolve against an empty reference set.
    #[error("Cannot fill forward against an empty reference set")]
    EmptyReference,

    #[error("Sequence is not sorted: {context}")]
    Unsorted { context: String },

    /// Localization overflowed even after shifting the instant back once.
    #[error("Time overflow localizing {time} for {entity}")]
    TimeOverflow {
        entity: EntityId,
        time: NaiveDateTime,
    },

    #[error("Day {day} is outside the cumulative window built for {entity}")]
    WindowOutOfRange { entity: EntityId, day: NaiveDate },

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid snapshot format")]
    InvalidFormat,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An external collaborator (event source, directory, ...) failed.
    #[error("Source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

#[cfg(feature = "snapshot")]
impl From<bincode::Error> for HistoryError {
    fn from(err: bincode::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}
