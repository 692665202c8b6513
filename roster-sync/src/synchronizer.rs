//! Change synchronizer: the only writer of the Data Store.
//!
//! Three inputs are reconciled into the store:
//! - the bulk load, which replaces everything (falling back to the cache
//!   when the remote is unavailable)
//! - local inserts and deletes, which are only *submitted*; their effect
//!   arrives back through the change feed
//! - the change feed itself, applied one event at a time
//!
//! Every step ends with a render, which also refreshes the fallback cache.

use crate::cache::FallbackCache;
use crate::config::{OrderPolicy, SyncConfig, UpdatePolicy};
use crate::error::SyncResult;
use crate::prompt::UserPrompt;
use crate::remote::{ChangeFeed, RemoteStore};
use crate::render::{RenderedView, ViewRenderer};
use crate::store::DataStore;
use roster_types::{ChangeEvent, Record, RecordForm, RecordId, ValidationError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Confirmation question asked before a delete is submitted.
pub const DELETE_CONFIRMATION: &str = "Delete this record?";

/// Where the last load took its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Remote,
    Fallback,
}

/// Result of a local insert or delete submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The remote accepted the mutation; the feed will reflect it.
    Submitted,
    /// The candidate failed validation; nothing was sent.
    Rejected(ValidationError),
    /// The user declined the confirmation; nothing was sent.
    Cancelled,
    /// The remote rejected the mutation or could not be reached.
    Failed(String),
}

/// What a change event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Appended,
    Removed(usize),
    Replaced,
    /// An update with no matching id was appended (`UpdatePolicy::Upsert`).
    Upserted,
    /// An update with no matching id was dropped.
    Dropped,
    /// The event kind is not reconciled.
    Ignored,
}

/// Owns the Data Store and keeps it, the view and the cache consistent.
pub struct Synchronizer {
    config: SyncConfig,
    remote: Arc<dyn RemoteStore>,
    store: DataStore,
    renderer: ViewRenderer,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Creates a synchronizer with an empty store.
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn FallbackCache>,
    ) -> Self {
        let renderer = ViewRenderer::new(cache, config.cache_slot.clone());
        Self {
            config,
            remote,
            store: DataStore::new(),
            renderer,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// The most recent render.
    pub fn view(&self) -> &RenderedView {
        self.renderer.view()
    }

    /// Re-renders the current store.
    pub async fn render(&mut self) -> &RenderedView {
        self.renderer.render(&self.store).await
    }

    // ── Load ─────────────────────────────────────────────────────

    /// Replaces the store with the remote contents, or with the fallback
    /// cache when the remote fails. Never fails; always renders.
    pub async fn load(&mut self) -> LoadSource {
        let (records, source) = match self.remote.fetch_all(&self.config.table).await {
            Ok(records) => {
                info!(
                    "Loaded {} records from {}",
                    records.len(),
                    self.remote.provider_name()
                );
                (records, LoadSource::Remote)
            }
            Err(e) => {
                error!("Remote load failed, using fallback cache: {e}");
                (self.read_fallback().await, LoadSource::Fallback)
            }
        };

        self.store.replace_all(records);
        if self.config.order_policy == OrderPolicy::CreatedAt {
            self.store.sort_by_created_at();
        }
        self.render().await;
        source
    }

    /// Same as [`Synchronizer::load`]; for refreshing an existing session.
    pub async fn reload(&mut self) -> LoadSource {
        self.load().await
    }

    /// Decodes the fallback cache. Absent or corrupt content is empty.
    async fn read_fallback(&self) -> Vec<Record> {
        let text = match self.renderer.cache().load(self.renderer.slot()).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!("Fallback cache is empty");
                return Vec::new();
            }
            Err(e) => {
                warn!("Fallback cache unreadable: {e}");
                return Vec::new();
            }
        };

        match DataStore::decode(&text) {
            Ok(store) => {
                info!("Restored {} records from fallback cache", store.len());
                store.snapshot().to_vec()
            }
            Err(e) => {
                warn!("Fallback cache is corrupt, starting empty: {e}");
                Vec::new()
            }
        }
    }

    // ── Local mutations ──────────────────────────────────────────

    /// Validates the form and submits it for creation.
    ///
    /// The store is not touched: the record arrives through the feed's
    /// INSERT, so a fast feed cannot produce a second copy.
    pub async fn submit_insert(&self, form: &RecordForm, prompt: &dyn UserPrompt) -> SubmitOutcome {
        let candidate = match form.validate() {
            Ok(candidate) => candidate,
            Err(e) => {
                debug!("Insert rejected before submission: {e}");
                prompt.alert(ValidationError::USER_MESSAGE);
                return SubmitOutcome::Rejected(e);
            }
        };

        match self.remote.insert(&self.config.table, &candidate).await {
            Ok(()) => SubmitOutcome::Submitted,
            Err(e) => {
                error!("Insert failed: {e}");
                let message = format!("Insert failed: {e}");
                prompt.alert(&message);
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Asks for confirmation, then submits a delete.
    ///
    /// As with inserts, removal from the store is left to the feed.
    pub async fn submit_delete(&self, id: &RecordId, prompt: &dyn UserPrompt) -> SubmitOutcome {
        if !prompt.confirm(DELETE_CONFIRMATION) {
            debug!("Delete of {} cancelled", id);
            return SubmitOutcome::Cancelled;
        }

        match self.remote.delete(&self.config.table, id).await {
            Ok(()) => SubmitOutcome::Submitted,
            Err(e) => {
                error!("Delete failed: {e}");
                let message = format!("Delete failed: {e}");
                prompt.alert(&message);
                SubmitOutcome::Failed(message)
            }
        }
    }

    // ── Change feed ──────────────────────────────────────────────

    /// Opens the change feed for the configured table.
    pub async fn subscribe(&self) -> SyncResult<ChangeFeed> {
        self.remote.subscribe(&self.config.table).await
    }

    /// Applies one change event, then renders unconditionally.
    pub async fn apply_change(&mut self, event: ChangeEvent) -> Reconciliation {
        let kind = event.kind();
        let outcome = match event {
            ChangeEvent::Insert(record) => {
                if self.store.get(&record.id).is_some() {
                    debug!("INSERT for {} already present; appending anyway", record.id);
                }
                self.store.append(record);
                Reconciliation::Appended
            }
            ChangeEvent::Delete(id) => Reconciliation::Removed(self.store.remove_by_id(&id)),
            ChangeEvent::Update(record) => match self.config.update_policy {
                UpdatePolicy::DropUnmatched => {
                    let id = record.id.clone();
                    if self.store.replace_by_id(record) {
                        Reconciliation::Replaced
                    } else {
                        debug!("UPDATE for unknown id {} dropped", id);
                        Reconciliation::Dropped
                    }
                }
                UpdatePolicy::Upsert => {
                    if self.store.upsert_by_id(record) {
                        Reconciliation::Replaced
                    } else {
                        Reconciliation::Upserted
                    }
                }
            },
            ChangeEvent::Other(name) => {
                debug!("Ignoring {} event", name);
                Reconciliation::Ignored
            }
        };

        let mutated = !matches!(
            outcome,
            Reconciliation::Dropped | Reconciliation::Ignored | Reconciliation::Removed(0)
        );
        if mutated && self.config.order_policy == OrderPolicy::CreatedAt {
            self.store.sort_by_created_at();
        }

        debug!("Applied {} event: {:?}", kind, outcome);
        self.render().await;
        outcome
    }
}
