//! Local view synchronization for Roster.
//!
//! Keeps three things consistent: an in-memory list of employee records, a
//! persisted fallback copy of that list, and the rendered table, in the face
//! of an asynchronous initial load, local mutations, and a push-based change
//! feed from the hosted backend.
//!
//! # Architecture
//!
//! - **Data Store** ([`DataStore`]): the ordered record list
//! - **Synchronizer** ([`Synchronizer`]): the only writer of the store;
//!   applies the load, local submissions and feed events
//! - **Renderer** ([`ViewRenderer`]): projects the store to rows and mirrors
//!   it to the [`FallbackCache`]
//! - **Session** ([`Session`]): single task draining commands and feed
//!   events one at a time
//!
//! The backend is reached through [`RemoteStore`]; [`RestStore`] speaks its
//! HTTP API and [`MockRemote`] stands in for it in tests.
//!
//! # Example
//!
//! ```
//! use roster_sync::{MemoryCache, MockRemote, SyncConfig, Synchronizer};
//! use std::sync::Arc;
//!
//! let sync = Synchronizer::new(
//!     SyncConfig::default(),
//!     Arc::new(MockRemote::new()),
//!     Arc::new(MemoryCache::new()),
//! );
//! assert!(sync.store().is_empty());
//! ```

pub mod cache;
mod config;
mod error;
pub mod prompt;
pub mod remote;
pub mod render;
mod session;
mod store;
mod synchronizer;

pub use cache::{FallbackCache, FileCache, MemoryCache};
pub use config::{OrderPolicy, SyncConfig, UpdatePolicy};
pub use error::{SyncError, SyncResult};
pub use prompt::UserPrompt;
pub use remote::{ChangeFeed, MockRemote, RemoteStore, RestConfig, RestStore};
pub use render::{DeleteAction, RenderedRow, RenderedView, ViewRenderer, escape_html};
pub use session::{Session, SessionCommand, SessionHandle};
pub use store::DataStore;
pub use synchronizer::{
    DELETE_CONFIRMATION, LoadSource, Reconciliation, SubmitOutcome, Synchronizer,
};
