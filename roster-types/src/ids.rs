//! Record identifiers.
//!
//! The remote store assigns ids; depending on the table definition they
//! arrive as JSON integers (`bigint identity`) or strings (`uuid`). The id is
//! opaque to this layer, so both shapes are kept exactly as received.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a record, assigned by the remote store and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Integer primary key.
    Int(i64),
    /// Textual primary key (UUID or similar).
    Text(String),
}

impl RecordId {
    /// Returns true when both ids render to the same text.
    ///
    /// Used where an id has been round-tripped through markup or a command
    /// line and its original JSON shape is no longer known.
    #[must_use]
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            Self::Int(n) => text.parse::<i64>().is_ok_and(|t| t == *n),
            Self::Text(s) => s == text,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    /// Digits become [`RecordId::Int`], anything else [`RecordId::Text`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(s.to_string()),
        })
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
