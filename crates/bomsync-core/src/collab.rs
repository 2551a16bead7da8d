//! Narrow interfaces to the engine's external collaborators.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::types::{HistoryEntry, SyncResult};

/// The opaque extract/transform/load run. One call is one attempt; the
/// engine never retries.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    async fn sync(&self) -> Result<SyncResult>;
}

/// Display data that is re-fetched after syncs and change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTarget {
    /// Source product-structure tree (assemblies + components).
    Tree,
    /// Rows of the ERP mirror table.
    MirrorTable,
    /// Sync history rows.
    History,
}

impl RefreshTarget {
    pub fn all() -> &'static [RefreshTarget] {
        &[
            RefreshTarget::Tree,
            RefreshTarget::MirrorTable,
            RefreshTarget::History,
        ]
    }
}

impl fmt::Display for RefreshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshTarget::Tree => "tree",
            RefreshTarget::MirrorTable => "mirror table",
            RefreshTarget::History => "history",
        };
        f.write_str(s)
    }
}

/// Idempotent re-fetch of display state. Failures are logged by the caller,
/// never propagated into the sync outcome.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, target: RefreshTarget) -> anyhow::Result<()>;
}

/// A refresher that does nothing, for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRefresher;

#[async_trait]
impl Refresher for NoopRefresher {
    async fn refresh(&self, _target: RefreshTarget) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Append-only destination for completed sync attempts.
pub trait HistorySink: Send + Sync {
    fn append(&self, entry: HistoryEntry);
    fn entries(&self) -> Vec<HistoryEntry>;
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: RwLock<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl HistorySink for MemoryHistory {
    fn append(&self, entry: HistoryEntry) {
        self.entries.write().push(entry);
    }

    fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.read().clone()
    }
}
