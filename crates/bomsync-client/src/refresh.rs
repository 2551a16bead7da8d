//! Display refreshes: re-fetch tree, mirror rows and history into a shared
//! in-memory cache that a presentation layer reads.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use bomsync_core::{RefreshTarget, Refresher};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, ARTICLES_PATH, HISTORY_PATH, TREE_PATH};

/// Last fetched payload per display target, `None` until the first fetch.
#[derive(Debug, Default)]
pub struct DisplayCache {
    tree: RwLock<Option<Value>>,
    mirror: RwLock<Option<Value>>,
    history: RwLock<Option<Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub tree: bool,
    pub mirror: bool,
    pub history: bool,
}

impl DisplayCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slot(&self, target: RefreshTarget) -> &RwLock<Option<Value>> {
        match target {
            RefreshTarget::Tree => &self.tree,
            RefreshTarget::MirrorTable => &self.mirror,
            RefreshTarget::History => &self.history,
        }
    }

    pub fn get(&self, target: RefreshTarget) -> Option<Value> {
        self.slot(target).read().clone()
    }

    pub fn put(&self, target: RefreshTarget, value: Value) {
        *self.slot(target).write() = Some(value);
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            tree: self.tree.read().is_some(),
            mirror: self.mirror.read().is_some(),
            history: self.history.read().is_some(),
        }
    }
}

pub fn path_for(target: RefreshTarget) -> &'static str {
    match target {
        RefreshTarget::Tree => TREE_PATH,
        RefreshTarget::MirrorTable => ARTICLES_PATH,
        RefreshTarget::History => HISTORY_PATH,
    }
}

/// [`Refresher`] backed by the sync API. A failed fetch leaves the previous
/// cached value in place.
#[derive(Debug, Clone)]
pub struct HttpRefresher {
    client: ApiClient,
    cache: Arc<DisplayCache>,
}

impl HttpRefresher {
    pub fn new(client: ApiClient, cache: Arc<DisplayCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<DisplayCache> {
        &self.cache
    }
}

#[async_trait]
impl Refresher for HttpRefresher {
    async fn refresh(&self, target: RefreshTarget) -> anyhow::Result<()> {
        let path = path_for(target);
        let value = self
            .client
            .get_json(path)
            .await
            .with_context(|| format!("GET {path}"))?;
        self.cache.put(target, value);
        Ok(())
    }
}
