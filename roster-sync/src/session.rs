//! Session loop: one task owns the synchronizer and drains a single queue.
//!
//! Commands from [`SessionHandle`]s and events from the change feed are
//! processed strictly one at a time, each to completion, so no two
//! reconciliation steps interleave. Every render is published on a watch
//! channel.
//!
//! A dropped feed is resubscribed after a doubling, capped delay, followed
//! by a reload to pick up whatever changed while it was down.

use crate::error::{SyncError, SyncResult};
use crate::prompt::UserPrompt;
use crate::remote::ChangeFeed;
use crate::render::RenderedView;
use crate::synchronizer::{LoadSource, SubmitOutcome, Synchronizer};
use roster_types::{ChangeEvent, RecordForm, RecordId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Capacity of the command queue.
const COMMAND_BUFFER: usize = 64;

/// Commands accepted by the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    Insert {
        form: RecordForm,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Delete {
        id: RecordId,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    Reload {
        reply: oneshot::Sender<LoadSource>,
    },
    Shutdown,
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    views: watch::Receiver<RenderedView>,
}

impl SessionHandle {
    /// Submits an insert. Resolves once the remote has answered.
    pub async fn insert(&self, form: RecordForm) -> SyncResult<SubmitOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Insert { form, reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Submits a delete (after the session's confirmation prompt).
    pub async fn delete(&self, id: RecordId) -> SyncResult<SubmitOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Delete { id, reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Reloads from the remote (or the fallback cache).
    pub async fn reload(&self) -> SyncResult<LoadSource> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Reload { reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Asks the loop to stop after the current step.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Subscribes to rendered views.
    pub fn views(&self) -> watch::Receiver<RenderedView> {
        self.views.clone()
    }

    /// The most recently published view.
    pub fn current_view(&self) -> RenderedView {
        self.views.borrow().clone()
    }

    async fn send(&self, command: SessionCommand) -> SyncResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }
}

/// The running session's state.
pub struct Session {
    sync: Synchronizer,
    prompt: Arc<dyn UserPrompt>,
    commands: mpsc::Receiver<SessionCommand>,
    feed: Option<ChangeFeed>,
    views: watch::Sender<RenderedView>,
    backoff: Backoff,
    resubscribe_at: Option<Instant>,
}

impl Session {
    /// Subscribes to the change feed, performs the initial load, and spawns
    /// the loop.
    ///
    /// The feed is opened before loading so no change is missed; an event
    /// for a row that the load already returned is then applied on top of
    /// it, like any other event. A failed subscription is logged and
    /// retried from the loop.
    ///
    /// The task yields the synchronizer back when the loop ends.
    pub async fn start(
        mut sync: Synchronizer,
        prompt: Arc<dyn UserPrompt>,
    ) -> (SessionHandle, JoinHandle<Synchronizer>) {
        let feed = match sync.subscribe().await {
            Ok(feed) => Some(feed),
            Err(e) => {
                error!("Realtime subscription failed: {e}");
                None
            }
        };

        let source = sync.load().await;
        debug!("Session started from {:?}", source);

        let (views_tx, views_rx) = watch::channel(sync.view().clone());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);

        let backoff = Backoff::new(
            Duration::from_millis(sync.config().resubscribe_base_ms),
            Duration::from_millis(sync.config().resubscribe_max_ms),
        );
        let mut session = Session {
            sync,
            prompt,
            commands: commands_rx,
            feed,
            views: views_tx,
            backoff,
            resubscribe_at: None,
        };
        if session.feed.is_none() {
            session.schedule_resubscribe();
        }
        let task = tokio::spawn(session.run());

        let handle = SessionHandle {
            commands: commands_tx,
            views: views_rx,
        };
        (handle, task)
    }

    async fn run(mut self) -> Synchronizer {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("All session handles dropped");
                        break;
                    };
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                event = next_event(&mut self.feed) => match event {
                    Some(event) => {
                        self.sync.apply_change(event).await;
                        self.publish();
                    }
                    None => {
                        warn!("Change feed closed");
                        self.feed = None;
                        self.schedule_resubscribe();
                    }
                },
                _ = wait_until(self.resubscribe_at) => self.resubscribe().await,
            }
        }

        info!("Session stopped");
        self.sync
    }

    /// Returns false when the loop should stop.
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Insert { form, reply } => {
                let outcome = self.sync.submit_insert(&form, self.prompt.as_ref()).await;
                let _ = reply.send(outcome);
            }
            SessionCommand::Delete { id, reply } => {
                let outcome = self.sync.submit_delete(&id, self.prompt.as_ref()).await;
                let _ = reply.send(outcome);
            }
            SessionCommand::Reload { reply } => {
                let source = self.sync.reload().await;
                self.publish();
                let _ = reply.send(source);
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    fn publish(&self) {
        self.views.send_replace(self.sync.view().clone());
    }

    fn schedule_resubscribe(&mut self) {
        let delay = self.backoff.next_delay();
        debug!("Resubscribing in {:?}", delay);
        self.resubscribe_at = Some(Instant::now() + delay);
    }

    /// Reopens the feed, then reloads so events missed while it was down
    /// are reflected.
    async fn resubscribe(&mut self) {
        self.resubscribe_at = None;
        match self.sync.subscribe().await {
            Ok(feed) => {
                info!("Change feed re-established");
                self.feed = Some(feed);
                self.backoff.reset();
                let source = self.sync.reload().await;
                debug!("Reloaded from {:?} after resubscribing", source);
                self.publish();
            }
            Err(e) => {
                warn!("Resubscribe failed: {e}");
                self.schedule_resubscribe();
            }
        }
    }
}

/// Doubling delay between resubscribe attempts, capped at `max`.
#[derive(Debug)]
struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        let next = self.current.checked_mul(2).unwrap_or(self.max);
        self.current = next.min(self.max);
        delay.min(self.max)
    }

    fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Resolves at `deadline`; never resolves when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Next event of an open feed; never resolves when there is none.
async fn next_event(feed: &mut Option<ChangeFeed>) -> Option<ChangeEvent> {
    match feed {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::Backoff;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_up_to_cap_and_resets() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }
}
