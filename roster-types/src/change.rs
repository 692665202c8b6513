//! Change events delivered by the realtime feed.
//!
//! The feed speaks in [`ChangePayload`] frames (`eventType`, `new`, `old`),
//! which are decoded into the typed [`ChangeEvent`] the synchronizer
//! reconciles against.

use crate::{Error, Record, RecordId, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A change notification on the subscribed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A row was created.
    Insert(Record),
    /// A row was replaced with new contents.
    Update(Record),
    /// A row was removed; only its id is known.
    Delete(RecordId),
    /// Any other event kind (e.g. `TRUNCATE`). Ignored by reconciliation.
    Other(String),
}

impl ChangeEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert(_) => ChangeKind::Insert,
            Self::Update(_) => ChangeKind::Update,
            Self::Delete(_) => ChangeKind::Delete,
            Self::Other(_) => ChangeKind::Other,
        }
    }
}

/// Event kind, for logging and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire frame of the realtime feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub new: Option<serde_json::Value>,
    #[serde(default)]
    pub old: Option<serde_json::Value>,
}

/// The part of an old row a delete notification is guaranteed to carry.
#[derive(Deserialize)]
struct RecordKey {
    id: RecordId,
}

impl ChangePayload {
    /// Parses one JSON frame.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decodes the frame into a typed event.
    ///
    /// `INSERT` and `UPDATE` need a complete record in `new`; `DELETE` needs
    /// at least an `id` in `old`. Unknown kinds decode to
    /// [`ChangeEvent::Other`].
    pub fn into_event(self) -> Result<ChangeEvent> {
        match self.event_type.as_str() {
            "INSERT" => Ok(ChangeEvent::Insert(decode_record(self.new, "INSERT", "new")?)),
            "UPDATE" => Ok(ChangeEvent::Update(decode_record(self.new, "UPDATE", "new")?)),
            "DELETE" => {
                let old = non_empty(self.old).ok_or(Error::MissingRecord {
                    kind: "DELETE",
                    field: "old",
                })?;
                let key: RecordKey = serde_json::from_value(old)?;
                Ok(ChangeEvent::Delete(key.id))
            }
            _ => Ok(ChangeEvent::Other(self.event_type)),
        }
    }
}

impl TryFrom<ChangePayload> for ChangeEvent {
    type Error = Error;

    fn try_from(payload: ChangePayload) -> Result<Self> {
        payload.into_event()
    }
}

fn decode_record(
    value: Option<serde_json::Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Record> {
    let value = non_empty(value).ok_or(Error::MissingRecord { kind, field })?;
    Ok(serde_json::from_value(value)?)
}

/// Treats `null` and `{}` the same as an absent field; the feed sends an
/// empty `old` on inserts and an empty `new` on deletes.
fn non_empty(value: Option<serde_json::Value>) -> Option<serde_json::Value> {
    value.filter(|v| match v {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    })
}
