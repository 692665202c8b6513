//! The Data Store: the ordered, in-memory view of records.
//!
//! The store is a plain owned value. Only the [`Synchronizer`] mutates it,
//! and it never persists itself; the renderer mirrors it to the fallback
//! cache once a reconciliation step is complete.
//!
//! [`Synchronizer`]: crate::Synchronizer

use crate::error::SyncResult;
use roster_types::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered sequence of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataStore {
    records: Vec<Record>,
}

impl DataStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the current contents and installs `records` verbatim.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    /// Adds `record` at the end. Does not check for an existing id.
    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Removes every record with the given id. Returns how many were removed.
    pub fn remove_by_id(&mut self, id: &RecordId) -> usize {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        before - self.records.len()
    }

    /// Replaces the first record sharing `record.id`.
    ///
    /// Returns false, and drops `record`, when no record has that id.
    pub fn replace_by_id(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Replaces the first record sharing `record.id`, or appends it.
    ///
    /// Returns true when an existing record was replaced.
    pub fn upsert_by_id(&mut self, record: Record) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => {
                self.records.push(record);
                false
            }
        }
    }

    /// Stable sort by `created_at`; records without a timestamp go last.
    pub fn sort_by_created_at(&mut self) {
        self.records
            .sort_by_key(|r| (r.created_at.is_none(), r.created_at));
    }

    /// The current sequence, in order.
    pub fn snapshot(&self) -> &[Record] {
        &self.records
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ids that occur more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<RecordId> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for record in &self.records {
            if !seen.insert(&record.id) && !dupes.contains(&record.id) {
                dupes.push(record.id.clone());
            }
        }
        dupes
    }

    /// Serializes the snapshot as JSON text.
    pub fn encode(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(&self.records)?)
    }

    /// Parses a snapshot previously produced by [`DataStore::encode`].
    ///
    /// A JSON `null` is accepted as an empty store.
    pub fn decode(text: &str) -> SyncResult<Self> {
        let records: Option<Vec<Record>> = serde_json::from_str(text)?;
        Ok(Self {
            records: records.unwrap_or_default(),
        })
    }
}

impl From<Vec<Record>> for DataStore {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}
