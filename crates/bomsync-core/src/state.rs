//! The single coordination context behind every engine mutation.
//!
//! All mutable engine state lives in one [`Context`] guarded by one mutex.
//! Holders never await while the lock is held, so mutations from timers,
//! change events and trigger completions are serialized without
//! interleaving.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::activity_log::{ActivityLog, LogEntry};
use crate::mode::ModeMachine;
use crate::scheduler::PeriodicScheduler;
use crate::types::{ConnectionStatus, SyncMode, SyncResult, SyncState, SyncTriggerSource};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastTrigger {
    pub source: SyncTriggerSource,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct Context {
    pub mode: ModeMachine,
    pub sync_state: SyncState,
    pub current_result: Option<SyncResult>,
    pub connection: ConnectionStatus,
    pub log: ActivityLog,
    pub scheduler: PeriodicScheduler,
    pub last_trigger: Option<LastTrigger>,
    /// Set once the startup sync has been issued; timers stay off before that.
    pub started: bool,
    revert: Option<JoinHandle<()>>,
    revert_epoch: u64,
}

pub(crate) type SharedContext = Arc<Mutex<Context>>;

impl Context {
    pub fn new(mode: ModeMachine, log: ActivityLog) -> Self {
        Self {
            mode,
            sync_state: SyncState::Idle,
            current_result: None,
            connection: ConnectionStatus::Connecting,
            log,
            scheduler: PeriodicScheduler::new(),
            last_trigger: None,
            started: false,
            revert: None,
            revert_epoch: 0,
        }
    }

    /// Cancel any pending revert and return the epoch for a new one.
    pub fn next_revert_epoch(&mut self) -> u64 {
        self.cancel_revert();
        self.revert_epoch += 1;
        self.revert_epoch
    }

    pub fn is_revert_epoch(&self, epoch: u64) -> bool {
        self.revert_epoch == epoch
    }

    pub fn set_revert(&mut self, handle: JoinHandle<()>) {
        self.revert = Some(handle);
    }

    pub fn cancel_revert(&mut self) {
        if let Some(handle) = self.revert.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode.mode(),
            interval_seconds: self.mode.interval_seconds(),
            sync_state: self.sync_state,
            current_result: self.current_result.clone(),
            countdown_remaining: self.scheduler.remaining(),
            connection: self.connection,
            last_trigger: self.last_trigger,
            log: self.log.snapshot(),
        }
    }
}

/// Read-only view of the engine for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: SyncMode,
    pub interval_seconds: u32,
    pub sync_state: SyncState,
    pub current_result: Option<SyncResult>,
    /// Seconds until the next scheduled sync; `None` unless in scheduled mode.
    pub countdown_remaining: Option<u32>,
    pub connection: ConnectionStatus,
    pub last_trigger: Option<LastTrigger>,
    pub log: Vec<LogEntry>,
}
