use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync endpoint unreachable: {0}")]
    TransportUnreachable(String),

    #[error("sync run failed: {0}")]
    RemoteFailed(String),

    #[error("change notification channel failed: {0}")]
    ConnectionFailure(String),

    #[error("a sync is already running")]
    Busy,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl SyncError {
    /// `true` for errors produced by the remote sync operation itself.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::TransportUnreachable(_) | SyncError::RemoteFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
