use std::sync::Arc;

use bomsync_client::DisplayCache;
use bomsync_core::{ChangeFeed, Orchestrator};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub engine: Orchestrator,
    /// Producer side of the change-notification transport the router reads.
    pub feed: ChangeFeed,
    pub cache: Arc<DisplayCache>,
}

impl AppState {
    pub fn new(engine: Orchestrator, feed: ChangeFeed, cache: Arc<DisplayCache>) -> Self {
        Self {
            engine,
            feed,
            cache,
        }
    }
}
