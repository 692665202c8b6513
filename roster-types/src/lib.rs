//! Core type definitions for Roster.
//!
//! This crate defines the plain data shared by the sync layer and the CLI:
//! - Record identifiers as assigned by the remote store
//! - Employee records and the raw entry form they are created from
//! - Change events delivered by the realtime feed, and their wire payload
//!
//! Nothing here performs I/O.

mod change;
mod ids;
mod record;

pub use change::{ChangeEvent, ChangeKind, ChangePayload};
pub use ids::RecordId;
pub use record::{NewRecord, Record, RecordForm, ValidationError};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding wire types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} change is missing its `{field}` record")]
    MissingRecord {
        kind: &'static str,
        field: &'static str,
    },
}
