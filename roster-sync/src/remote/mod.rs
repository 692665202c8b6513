//! Remote store abstraction.
//!
//! The hosted backend owns persistence, querying and realtime fan-out. This
//! layer only needs four calls: a bulk query, insert, delete, and a
//! subscription to the table's change feed.

pub mod mock;
pub mod rest;

use crate::error::SyncResult;
use async_trait::async_trait;
use roster_types::{ChangeEvent, NewRecord, Record, RecordId};
use tokio::sync::mpsc;

pub use mock::MockRemote;
pub use rest::{RestConfig, RestStore};

/// Receiving end of a table's change feed. Yields `None` once the remote
/// closes the subscription.
pub type ChangeFeed = mpsc::Receiver<ChangeEvent>;

/// Capacity of the channel between a feed reader and its consumer.
pub const FEED_BUFFER: usize = 256;

/// Abstract remote store interface.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the name of the backend, for logging.
    fn provider_name(&self) -> &'static str;

    /// Fetches every record of `table`, ordered by `created_at` ascending.
    async fn fetch_all(&self, table: &str) -> SyncResult<Vec<Record>>;

    /// Submits one record for creation.
    async fn insert(&self, table: &str, record: &NewRecord) -> SyncResult<()>;

    /// Submits one id for deletion.
    async fn delete(&self, table: &str, id: &RecordId) -> SyncResult<()>;

    /// Opens a long-lived change feed for `table`.
    async fn subscribe(&self, table: &str) -> SyncResult<ChangeFeed>;
}
