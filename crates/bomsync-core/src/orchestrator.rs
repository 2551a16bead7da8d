//! The orchestrator: receives triggers, runs them through the guard and
//! turns outcomes into activity-log entries and display refreshes.
//!
//! ```text
//! scheduler ──┐
//! router ─────┼─► request() ─► dispatch loop ─► trigger(source)
//! manual ─────┘                                    │
//!                                   SyncGuard::try_begin ─ Busy ─► warning
//!                                                  │
//!                                        remote sync (own task)
//!                                                  │
//!                        5-line summary + refresh(tree, mirror, history)
//! ```
//!
//! `Orchestrator` is a cheap, cloneable handle; every clone drives the same
//! engine.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::activity_log::{ActivityLog, Severity};
use crate::collab::{
    HistorySink, MemoryHistory, NoopRefresher, RefreshTarget, Refresher, RemoteSync,
};
use crate::config::EngineConfig;
use crate::error::{Result, SyncError};
use crate::guard::{RevertDelays, SyncAttempt, SyncGuard};
use crate::mode::ModeMachine;
use crate::scheduler::TriggerRequest;
use crate::state::{Context, SharedContext, Snapshot};
use crate::types::{
    ConnectionStatus, HistoryEntry, SyncMode, SyncResult, SyncState, SyncTriggerSource,
};

/// Validation messages listed individually after a run; the rest are counted.
const MAX_LISTED_ERRORS: usize = 5;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures an [`Orchestrator`]. Obtained from [`Orchestrator::builder`];
/// anything not set falls back to the engine defaults.
pub struct OrchestratorBuilder {
    remote: Arc<dyn RemoteSync>,
    refresher: Arc<dyn Refresher>,
    history: Arc<dyn HistorySink>,
    mode: SyncMode,
    interval_seconds: i64,
    delays: RevertDelays,
    log_capacity: usize,
}

impl OrchestratorBuilder {
    /// Display refresher invoked after each sync and on each change.
    pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refresher = refresher;
        self
    }

    /// Sink receiving one entry per successful attempt.
    pub fn history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = history;
        self
    }

    pub fn mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Scheduler interval; validated by [`build`](Self::build).
    pub fn interval_seconds(mut self, seconds: i64) -> Self {
        self.interval_seconds = seconds;
        self
    }

    pub fn revert_delays(mut self, delays: RevertDelays) -> Self {
        self.delays = delays;
        self
    }

    /// Maximum activity log entries kept before the oldest is evicted.
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Apply mode, interval, revert delays and log capacity from a config.
    pub fn config(self, config: &EngineConfig) -> Self {
        self.mode(config.mode)
            .interval_seconds(i64::from(config.interval_seconds))
            .revert_delays(config.revert_delays())
            .log_capacity(config.log_capacity)
    }

    /// Fails with [`SyncError::ConfigInvalid`] when the interval is out of
    /// range.
    pub fn build(self) -> Result<Orchestrator> {
        let mode = ModeMachine::new(self.mode, self.interval_seconds)?;
        let ctx: SharedContext = Arc::new(Mutex::new(Context::new(
            mode,
            ActivityLog::with_capacity(self.log_capacity),
        )));
        let (notify, _) = broadcast::channel(256);
        let (triggers, trigger_rx) = mpsc::unbounded_channel();
        let guard = SyncGuard::new(
            ctx.clone(),
            self.remote,
            self.history.clone(),
            notify.clone(),
            self.delays,
        );
        Ok(Orchestrator {
            inner: Arc::new(Inner {
                ctx,
                guard,
                refresher: self.refresher,
                history: self.history,
                notify,
                triggers,
                trigger_rx: Mutex::new(Some(trigger_rx)),
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

struct Inner {
    ctx: SharedContext,
    guard: SyncGuard,
    refresher: Arc<dyn Refresher>,
    history: Arc<dyn HistorySink>,
    notify: broadcast::Sender<()>,
    triggers: mpsc::UnboundedSender<TriggerRequest>,
    trigger_rx: Mutex<Option<mpsc::UnboundedReceiver<TriggerRequest>>>,
}

/// Handle to the running engine.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Start configuring an engine around `remote`, the operation that
    /// performs the actual sync.
    pub fn builder(remote: Arc<dyn RemoteSync>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            remote,
            refresher: Arc::new(NoopRefresher),
            history: Arc::new(MemoryHistory::new()),
            mode: SyncMode::default(),
            interval_seconds: i64::from(crate::mode::DEFAULT_INTERVAL_SECS),
            delays: RevertDelays::default(),
            log_capacity: crate::activity_log::DEFAULT_LOG_CAPACITY,
        }
    }

    /// Bring the engine up: run the startup sync, then arm the trigger
    /// sources. The startup sync runs whatever the configured mode is, and
    /// its outcome is returned.
    ///
    /// Calling `start` twice is a no-op returning `Ok(None)`.
    pub async fn start(&self) -> Result<Option<SyncResult>> {
        let Some(rx) = self.inner.trigger_rx.lock().take() else {
            return Ok(None);
        };

        let mode = self.mode();
        self.log(Severity::Info, format!("Sync engine starting in {mode} mode"));
        let startup = self.trigger(SyncTriggerSource::Startup).await;

        {
            let mut ctx = self.inner.ctx.lock();
            ctx.started = true;
            self.apply_scheduler(&mut ctx);
        }
        self.spawn_dispatch(rx);
        self.notify();

        match startup {
            Ok(result) => Ok(Some(result)),
            Err(SyncError::Busy) => {
                self.log(
                    Severity::Info,
                    "Startup sync superseded by the sync already in progress",
                );
                Ok(None)
            }
            Err(e) if e.is_remote() => {
                // Already logged and reflected in SyncState; the engine stays up.
                debug!(error = %e, "startup sync failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run one sync attempt for `source` and record its outcome.
    ///
    /// Returns `Err(SyncError::Busy)` without doing anything when a sync is
    /// already running.
    ///
    /// Once the slot is claimed the attempt and everything it logs or
    /// refreshes run on a spawned task. Dropping the returned future only
    /// stops waiting for the result.
    pub async fn trigger(&self, source: SyncTriggerSource) -> Result<SyncResult> {
        let attempt = match self.inner.guard.try_begin(source) {
            Ok(attempt) => attempt,
            Err(SyncError::Busy) => {
                self.log(
                    Severity::Warning,
                    format!("Sync already in progress, {source} trigger skipped"),
                );
                return Err(SyncError::Busy);
            }
            Err(e) => return Err(e),
        };

        self.log(Severity::Info, format!("Starting {source} sync..."));
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.complete(attempt).await });
        match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(SyncError::RemoteFailed(format!(
                "sync task ended abnormally: {join_err}"
            ))),
        }
    }

    async fn complete(&self, attempt: SyncAttempt) -> Result<SyncResult> {
        match attempt.run().await {
            Ok(result) => {
                self.log_summary(&result);
                self.refresh_all().await;
                Ok(result)
            }
            Err(e) => {
                self.log(Severity::Error, format!("Sync failed: {e}"));
                Err(e)
            }
        }
    }

    /// Queue a trigger for the dispatch loop without waiting for it.
    pub fn request(&self, source: SyncTriggerSource) {
        self.enqueue(TriggerRequest::new(source));
    }

    pub(crate) fn enqueue(&self, request: TriggerRequest) {
        if self.inner.triggers.send(request).is_err() {
            debug!(source = %request.source, "dispatch loop closed, trigger dropped");
        }
    }

    fn spawn_dispatch(&self, mut rx: mpsc::UnboundedReceiver<TriggerRequest>) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let engine = Orchestrator { inner };
                if let Some(generation) = request.generation {
                    let current = engine.inner.ctx.lock().scheduler.is_current(generation);
                    if !current {
                        debug!(generation, "dropping trigger from a cancelled schedule");
                        continue;
                    }
                }
                tokio::spawn(async move {
                    let _ = engine.trigger(request.source).await;
                });
            }
            debug!("trigger dispatch loop exited");
        })
    }

    fn log_summary(&self, result: &SyncResult) {
        let error_severity = if result.errors > 0 {
            Severity::Warning
        } else {
            Severity::Info
        };
        let mut ctx = self.inner.ctx.lock();
        ctx.log.push(
            Severity::Info,
            format!("Extract: {} parts read from source", result.total_parts),
        );
        ctx.log.push(
            Severity::Info,
            format!(
                "Transform: {} parts mapped to mirror records",
                result.inserted + result.updated
            ),
        );
        ctx.log.push(
            Severity::Info,
            format!(
                "Load: {} inserted, {} updated",
                result.inserted, result.updated
            ),
        );
        ctx.log
            .push(error_severity, format!("Errors: {}", result.errors));
        ctx.log.push(
            Severity::Success,
            format!("Sync completed in {:.2}s", result.duration_seconds),
        );

        for message in result.error_messages.iter().take(MAX_LISTED_ERRORS) {
            ctx.log.push(Severity::Warning, message.clone());
        }
        if result.error_messages.len() > MAX_LISTED_ERRORS {
            ctx.log.push(
                Severity::Warning,
                format!(
                    "... and {} more",
                    result.error_messages.len() - MAX_LISTED_ERRORS
                ),
            );
        }
        drop(ctx);
        self.notify();
    }

    async fn refresh_all(&self) {
        let refresher = &self.inner.refresher;
        let (tree, mirror, history) = futures::join!(
            refresher.refresh(RefreshTarget::Tree),
            refresher.refresh(RefreshTarget::MirrorTable),
            refresher.refresh(RefreshTarget::History),
        );
        for (target, outcome) in [
            (RefreshTarget::Tree, tree),
            (RefreshTarget::MirrorTable, mirror),
            (RefreshTarget::History, history),
        ] {
            if let Err(e) = outcome {
                self.log(
                    Severity::Warning,
                    format!("Refresh of {target} failed: {e:#}"),
                );
            }
        }
    }

    /// Re-fetch one display target, logging (not returning) a failure.
    pub async fn refresh(&self, target: RefreshTarget) {
        if let Err(e) = self.inner.refresher.refresh(target).await {
            self.log(
                Severity::Warning,
                format!("Refresh of {target} failed: {e:#}"),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Mode state machine
    // -----------------------------------------------------------------------

    /// Current trigger mode.
    pub fn mode(&self) -> SyncMode {
        self.inner.ctx.lock().mode.mode()
    }

    /// Current scheduler interval in seconds.
    pub fn interval_seconds(&self) -> u32 {
        self.inner.ctx.lock().mode.interval_seconds()
    }

    /// Switch trigger mode; entering or leaving `Scheduled` arms or cancels
    /// the periodic timers. Setting the current mode again changes nothing.
    pub fn set_mode(&self, mode: SyncMode) {
        {
            let mut ctx = self.inner.ctx.lock();
            if !ctx.mode.set_mode(mode) {
                return;
            }
            ctx.log.info(format!("Sync mode set to {mode}"));
            self.apply_scheduler(&mut ctx);
        }
        self.notify();
    }

    /// Parse and apply a mode; an unknown value is rejected untouched.
    pub fn set_mode_str(&self, mode: &str) -> Result<SyncMode> {
        let mode = mode.parse::<SyncMode>()?;
        self.set_mode(mode);
        Ok(mode)
    }

    /// Change the scheduler interval. While in `Scheduled` mode this restarts
    /// both the countdown and the firing timer with the new value.
    pub fn set_interval(&self, seconds: i64) -> Result<u32> {
        let interval = {
            let mut ctx = self.inner.ctx.lock();
            let interval = ctx.mode.set_interval(seconds)?;
            ctx.log.info(format!("Sync interval set to {interval}s"));
            if ctx.mode.mode() == SyncMode::Scheduled {
                self.apply_scheduler(&mut ctx);
            }
            interval
        };
        self.notify();
        Ok(interval)
    }

    fn apply_scheduler(&self, ctx: &mut Context) {
        if !ctx.started {
            return;
        }
        if ctx.mode.mode() == SyncMode::Scheduled {
            let interval = ctx.mode.interval_seconds();
            ctx.scheduler
                .start(interval, self.inner.triggers.clone(), self.inner.notify.clone());
            ctx.log
                .info(format!("Next scheduled sync in {interval}s"));
        } else {
            ctx.scheduler.stop();
        }
    }

    // -----------------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------------

    /// Everything observable about the engine, taken under one lock.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.ctx.lock().snapshot()
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner.ctx.lock().sync_state
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.inner.ctx.lock().connection
    }

    /// Successful attempts recorded so far, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.entries()
    }

    /// Receives a unit message after every observable state change.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.notify.subscribe()
    }

    pub(crate) fn set_connection(&self, status: ConnectionStatus) {
        self.inner.ctx.lock().connection = status;
        self.notify();
    }

    /// Append to the activity log and notify subscribers.
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        self.inner.ctx.lock().log.push(severity, message);
        self.notify();
    }

    fn notify(&self) {
        let _ = self.inner.notify.send(());
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.mode())
            .field("sync_state", &self.sync_state())
            .finish()
    }
}
