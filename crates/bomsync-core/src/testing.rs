//! Test doubles shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::collab::{RefreshTarget, Refresher, RemoteSync};
use crate::error::{Result, SyncError};
use crate::types::SyncResult;

pub struct MockRemote {
    calls: AtomicUsize,
    delay: Duration,
    outcome: std::result::Result<SyncResult, String>,
}

impl MockRemote {
    /// 42 parts read, 4 inserted, 36 updated, 2 validation errors.
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            outcome: Ok(SyncResult {
                total_parts: 42,
                inserted: 4,
                updated: 36,
                errors: 2,
                duration_seconds: 1.5,
                version: Some("1.0.0".into()),
                error_messages: vec!["part X-1: missing unit".into(), "part X-2: bad qty".into()],
            }),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            outcome: Err(message.to_string()),
        })
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            outcome: self.outcome.clone(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSync for MockRemote {
    async fn sync(&self) -> Result<SyncResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome
            .clone()
            .map_err(SyncError::TransportUnreachable)
    }
}

#[derive(Default)]
pub struct MockRefresher {
    counts: Mutex<HashMap<RefreshTarget, usize>>,
    fail: bool,
    delay: Duration,
}

impl MockRefresher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn count(&self, target: RefreshTarget) -> usize {
        self.counts.lock().get(&target).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Refresher for MockRefresher {
    async fn refresh(&self, target: RefreshTarget) -> anyhow::Result<()> {
        *self.counts.lock().entry(target).or_default() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            anyhow::bail!("display backend offline");
        }
        Ok(())
    }
}
