//! Employee records.
//!
//! A [`Record`] is what the remote store hands back: it always carries the
//! store-assigned `id` and the two required text fields. A [`NewRecord`] is a
//! validated candidate that has not been stored yet, produced from the raw
//! text of a [`RecordForm`].

use crate::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One employee entry as held by the remote store.
///
/// Decoding fails when `id`, `name` or `custom_id` is missing, so a record
/// is only ever constructed whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub salary: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    pub custom_id: String,
    /// Assigned by the remote store; used for load ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates a record with only the required fields set.
    pub fn new(
        id: impl Into<RecordId>,
        name: impl Into<String>,
        custom_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age: None,
            salary: None,
            gender: None,
            custom_id: custom_id.into(),
            created_at: None,
        }
    }

    /// Builds the stored form of a candidate once the store has assigned
    /// an id and timestamp.
    pub fn from_new(id: RecordId, created_at: DateTime<Utc>, new: NewRecord) -> Self {
        Self {
            id,
            name: new.name,
            age: new.age,
            salary: new.salary,
            gender: new.gender,
            custom_id: new.custom_id,
            created_at: Some(created_at),
        }
    }

    #[must_use]
    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    #[must_use]
    pub fn with_salary(mut self, salary: i64) -> Self {
        self.salary = Some(salary);
        self
    }

    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A validated record candidate, ready to submit for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub name: String,
    pub age: Option<i64>,
    pub salary: Option<i64>,
    pub gender: Option<String>,
    pub custom_id: String,
}

/// Why a candidate was rejected before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name is required")]
    MissingName,

    #[error("custom ID is required")]
    MissingCustomId,
}

impl ValidationError {
    /// The message shown to the user for any validation failure.
    pub const USER_MESSAGE: &'static str = "Please provide name and custom ID";
}

/// Raw text of the record-entry form, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordForm {
    pub name: String,
    pub age: String,
    pub salary: String,
    pub gender: String,
    pub custom_id: String,
}

impl RecordForm {
    /// Trims and parses the form into a candidate.
    ///
    /// `name` and `custom_id` must be non-empty after trimming. `age` and
    /// `salary` take their leading integer, or `None` when there is none.
    /// A blank `gender` becomes `None`.
    pub fn validate(&self) -> Result<NewRecord, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let custom_id = self.custom_id.trim();
        if custom_id.is_empty() {
            return Err(ValidationError::MissingCustomId);
        }
        let gender = self.gender.trim();

        Ok(NewRecord {
            name: name.to_string(),
            age: parse_leading_int(&self.age),
            salary: parse_leading_int(&self.salary),
            gender: (!gender.is_empty()).then(|| gender.to_string()),
            custom_id: custom_id.to_string(),
        })
    }
}

/// Parses the optional sign and leading decimal digits of `text`, ignoring
/// anything after them. `"42 years"` is 42; `"abc"` and `""` are `None`.
fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    text[..sign_len + digits].parse().ok()
}
