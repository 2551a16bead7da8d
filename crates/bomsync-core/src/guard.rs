//! Single-flight wrapper around the remote sync operation.
//!
//! Entering `Running` is an atomic check-and-set under the context lock:
//! two triggers can never both observe a free slot. A trigger that finds a
//! sync in flight gets [`SyncError::Busy`] and is dropped, not queued.
//!
//! The remote call runs on its own task, so dropping the caller's future
//! (a disconnected HTTP client, a cancelled `select!`) never abandons an
//! attempt half way: it always reaches `Succeeded` or `Failed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::collab::{HistorySink, RemoteSync};
use crate::error::{Result, SyncError};
use crate::state::{Context, LastTrigger, SharedContext};
use crate::types::{HistoryEntry, SyncResult, SyncState, SyncTriggerSource};

/// How long the terminal display states linger before reverting to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevertDelays {
    pub succeeded: Duration,
    pub failed: Duration,
}

impl Default for RevertDelays {
    fn default() -> Self {
        Self {
            succeeded: Duration::from_secs(2),
            failed: Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
pub struct SyncGuard {
    ctx: SharedContext,
    remote: Arc<dyn RemoteSync>,
    history: Arc<dyn HistorySink>,
    notify: broadcast::Sender<()>,
    delays: RevertDelays,
}

impl SyncGuard {
    pub(crate) fn new(
        ctx: SharedContext,
        remote: Arc<dyn RemoteSync>,
        history: Arc<dyn HistorySink>,
        notify: broadcast::Sender<()>,
        delays: RevertDelays,
    ) -> Self {
        Self {
            ctx,
            remote,
            history,
            notify,
            delays,
        }
    }

    pub fn state(&self) -> SyncState {
        self.ctx.lock().sync_state
    }

    /// Claim the single slot, moving `SyncState` to `Running`.
    pub fn try_begin(&self, source: SyncTriggerSource) -> Result<SyncAttempt> {
        {
            let mut ctx = self.ctx.lock();
            if ctx.sync_state == SyncState::Running {
                debug!(%source, "sync slot taken");
                return Err(SyncError::Busy);
            }
            ctx.cancel_revert();
            ctx.sync_state = SyncState::Running;
            ctx.last_trigger = Some(LastTrigger {
                source,
                at: chrono::Utc::now(),
            });
        }
        let _ = self.notify.send(());
        Ok(SyncAttempt {
            guard: Some(self.clone()),
            source,
        })
    }

    /// `try_begin` + `SyncAttempt::run`.
    pub async fn run(&self, source: SyncTriggerSource) -> Result<SyncResult> {
        self.try_begin(source)?.run().await
    }

    fn finish(
        &self,
        source: SyncTriggerSource,
        outcome: Result<SyncResult>,
    ) -> Result<SyncResult> {
        {
            let mut ctx = self.ctx.lock();
            match &outcome {
                Ok(result) => {
                    ctx.sync_state = SyncState::Succeeded;
                    ctx.current_result = Some(result.clone());
                    self.history
                        .append(HistoryEntry::new(source, result.clone()));
                    self.schedule_revert(&mut ctx, SyncState::Succeeded, self.delays.succeeded);
                    info!(
                        %source,
                        total_parts = result.total_parts,
                        inserted = result.inserted,
                        updated = result.updated,
                        errors = result.errors,
                        "sync succeeded"
                    );
                }
                Err(e) => {
                    ctx.sync_state = SyncState::Failed;
                    self.schedule_revert(&mut ctx, SyncState::Failed, self.delays.failed);
                    warn!(%source, error = %e, "sync failed");
                }
            }
        }
        let _ = self.notify.send(());
        outcome
    }

    fn schedule_revert(&self, ctx: &mut Context, from: SyncState, delay: Duration) {
        let epoch = ctx.next_revert_epoch();
        let shared = self.ctx.clone();
        let notify = self.notify.clone();
        ctx.set_revert(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let reverted = {
                let mut ctx = shared.lock();
                if ctx.is_revert_epoch(epoch) && ctx.sync_state == from {
                    ctx.sync_state = SyncState::Idle;
                    true
                } else {
                    false
                }
            };
            if reverted {
                debug!(from = %from, "sync state reverted to idle");
                let _ = notify.send(());
            }
        }));
    }

    /// Return an unused slot without touching results or history.
    fn release(&self) {
        let mut ctx = self.ctx.lock();
        if ctx.sync_state == SyncState::Running {
            ctx.sync_state = SyncState::Idle;
        }
        drop(ctx);
        let _ = self.notify.send(());
    }
}

/// A claimed sync slot. Dropping it without calling [`run`](Self::run)
/// gives the slot back.
pub struct SyncAttempt {
    guard: Option<SyncGuard>,
    source: SyncTriggerSource,
}

impl SyncAttempt {
    pub fn source(&self) -> SyncTriggerSource {
        self.source
    }

    /// Invoke the remote operation exactly once and record the outcome.
    pub async fn run(mut self) -> Result<SyncResult> {
        let Some(guard) = self.guard.take() else {
            return Err(SyncError::Busy);
        };
        let source = self.source;

        let task_guard = guard.clone();
        let handle = tokio::spawn(async move {
            let outcome = task_guard.remote.sync().await;
            task_guard.finish(source, outcome)
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => guard.finish(
                source,
                Err(SyncError::RemoteFailed(format!(
                    "sync task ended abnormally: {join_err}"
                ))),
            ),
        }
    }
}

impl Drop for SyncAttempt {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard.release();
        }
    }
}
