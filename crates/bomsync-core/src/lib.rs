pub mod activity_log;
pub mod collab;
pub mod config;
pub mod error;
pub mod guard;
pub mod mode;
pub mod orchestrator;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use activity_log::{ActivityLog, LogEntry, Severity};
pub use collab::{
    HistorySink, MemoryHistory, NoopRefresher, RefreshTarget, Refresher, RemoteSync,
};
pub use config::EngineConfig;
pub use error::{Result, SyncError};
pub use orchestrator::Orchestrator;
pub use router::{ChangeRouter, RouteAction};
pub use state::Snapshot;
pub use transport::{
    ChangeFeed, ChangeTransport, ChannelTransport, ReplayTransport, TransportSignal,
    TransportStatus,
};
pub use types::{
    ChangeEvent, ChangeKind, ConnectionStatus, Entity, HistoryEntry, SyncMode, SyncResult,
    SyncState, SyncTriggerSource,
};
