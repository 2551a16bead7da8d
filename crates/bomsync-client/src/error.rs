use bomsync_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer. `detail` is the API's own message when it sent one.
    #[error("{status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },

    #[error("invalid response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API URL '{0}'")]
    InvalidUrl(String),
}

impl From<ClientError> for SyncError {
    fn from(e: ClientError) -> Self {
        SyncError::TransportUnreachable(e.to_string())
    }
}
