//! Subcommand implementations.

use crate::cli::Format;
use crate::config::RosterConfig;
use anyhow::{Context, Result, bail};
use roster_sync::{
    FileCache, LoadSource, RenderedView, RestStore, Session, SubmitOutcome, Synchronizer,
    UserPrompt,
};
use roster_types::RecordForm;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds a synchronizer over the REST backend and the file cache.
pub fn connect(config: &RosterConfig) -> Result<Synchronizer> {
    let remote = RestStore::new(config.rest.clone()).context("failed to create REST client")?;
    let cache = FileCache::new(&config.cache_dir);
    info!(
        "Using table {} via {}",
        config.sync.table,
        config.rest.base_url
    );
    Ok(Synchronizer::new(
        config.sync.clone(),
        Arc::new(remote),
        Arc::new(cache),
    ))
}

/// Loads the roster and returns it in the requested format.
pub async fn list(sync: &mut Synchronizer, format: Format) -> String {
    if sync.load().await == LoadSource::Fallback {
        warn!("Remote store unreachable, showing the cached roster");
    }
    match format {
        Format::Table => sync.view().to_text(),
        Format::Html => sync.view().html().to_string(),
    }
}

/// Submits a new record.
pub async fn add(
    sync: &Synchronizer,
    form: &RecordForm,
    prompt: &dyn UserPrompt,
) -> SubmitOutcome {
    sync.submit_insert(form, prompt).await
}

/// Deletes the record whose id reads `data_id`, after confirmation.
///
/// The id is resolved against the loaded roster, so an unknown id fails
/// before anything is asked or sent.
pub async fn delete(
    sync: &mut Synchronizer,
    data_id: &str,
    prompt: &dyn UserPrompt,
) -> Result<SubmitOutcome> {
    sync.load().await;
    let Some(id) = sync.view().resolve_delete(data_id).cloned() else {
        bail!("no record with id {data_id}");
    };
    Ok(sync.submit_delete(&id, prompt).await)
}

/// Runs a session, handing every published view to `out` until
/// `shutdown` resolves or the session ends. Returns the synchronizer.
pub async fn watch<F>(
    sync: Synchronizer,
    prompt: Arc<dyn UserPrompt>,
    shutdown: F,
    mut out: impl FnMut(&RenderedView),
) -> Result<Synchronizer>
where
    F: Future<Output = ()>,
{
    let (handle, task) = Session::start(sync, prompt).await;
    let mut views = handle.views();
    out(&*views.borrow_and_update());

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping watch");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                out(&*views.borrow_and_update());
            }
        }
    }

    // The loop may already have ended on its own.
    let _ = handle.shutdown().await;
    task.await.context("session task failed")
}
