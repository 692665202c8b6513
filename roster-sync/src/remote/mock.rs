//! An in-process remote store for testing.
//!
//! Behaves like the hosted backend as far as this layer can observe: it
//! assigns integer ids and increasing timestamps, answers bulk queries in
//! `created_at` order, and fans INSERT/DELETE notifications out to every
//! subscriber. Each call can be made to fail.

use super::{ChangeFeed, FEED_BUFFER, RemoteStore};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use roster_types::{ChangeEvent, NewRecord, Record, RecordId};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

/// Mock remote store.
#[derive(Debug)]
pub struct MockRemote {
    rows: Mutex<Vec<Record>>,
    subscribers: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
    next_id: AtomicI64,
    fail_fetch: AtomicBool,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
    fetch_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemote {
    /// Creates an empty remote.
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_fetch: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a remote already holding `rows`. New ids continue after the
    /// largest integer id present.
    pub fn with_rows(rows: Vec<Record>) -> Self {
        let max_id = rows
            .iter()
            .filter_map(|r| match r.id {
                RecordId::Int(n) => Some(n),
                RecordId::Text(_) => None,
            })
            .max()
            .unwrap_or(0);
        let remote = Self::new();
        remote.next_id.store(max_id + 1, Ordering::SeqCst);
        *lock(&remote.rows) = rows;
        remote
    }

    /// Timestamp the mock assigns to the row with integer id `n`.
    pub fn timestamp_for(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
            + Duration::seconds(n)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_insert(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Current server-side rows.
    pub fn rows(&self) -> Vec<Record> {
        lock(&self.rows).clone()
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// Delivers an arbitrary event to every subscriber, without touching
    /// the server-side rows.
    ///
    /// Never waits: a subscriber whose queue is full misses the event, as
    /// it would on a lagging realtime connection.
    pub fn emit(&self, event: ChangeEvent) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| !tx.is_closed());
        for tx in subscribers.iter() {
            if let Err(TrySendError::Full(_)) = tx.try_send(event.clone()) {
                warn!("Subscriber queue full, dropping {} event", event.kind());
            }
        }
    }

    /// Ends every open subscription.
    pub fn close_feeds(&self) {
        lock(&self.subscribers).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl RemoteStore for MockRemote {
    fn provider_name(&self) -> &'static str {
        "Mock"
    }

    async fn fetch_all(&self, _table: &str) -> SyncResult<Vec<Record>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SyncError::Network("connection refused".into()));
        }
        let mut rows = self.rows();
        rows.sort_by_key(|r| (r.created_at.is_none(), r.created_at));
        Ok(rows)
    }

    async fn insert(&self, _table: &str, record: &NewRecord) -> SyncResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                status: 409,
                message: format!("duplicate key value: {}", record.custom_id),
            });
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = Record::from_new(RecordId::Int(n), Self::timestamp_for(n), record.clone());
        lock(&self.rows).push(stored.clone());
        self.emit(ChangeEvent::Insert(stored));
        Ok(())
    }

    async fn delete(&self, _table: &str, id: &RecordId) -> SyncResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                status: 403,
                message: "permission denied".into(),
            });
        }

        let removed = {
            let mut rows = lock(&self.rows);
            let before = rows.len();
            rows.retain(|r| &r.id != id);
            before != rows.len()
        };
        if removed {
            self.emit(ChangeEvent::Delete(id.clone()));
        }
        Ok(())
    }

    async fn subscribe(&self, _table: &str) -> SyncResult<ChangeFeed> {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        lock(&self.subscribers).push(tx);
        Ok(rx)
    }
}
