//! Client for the sync API.
//!
//! ```text
//! POST /api/sync               run summary (see SyncResponse)
//! GET  /api/bom/tree           {"tree": [...], "count": n}
//! GET  /api/sage100/articles   {"articles": [...], "count": n}
//! GET  /api/sync/history       {"history": [...]}
//! ```
//!
//! Errors come back as `{"detail": "..."}` with a non-2xx status.

use std::time::Duration;

use async_trait::async_trait;
use bomsync_core::{EngineConfig, RemoteSync, SyncError, SyncResult};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;

pub const SYNC_PATH: &str = "/api/sync";
pub const TREE_PATH: &str = "/api/bom/tree";
pub const ARTICLES_PATH: &str = "/api/sage100/articles";
pub const HISTORY_PATH: &str = "/api/sync/history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Completed,
    CompletedWithErrors,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Run summary as the sync API reports it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub total_parts: u64,
    #[serde(default)]
    pub inserted: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: RunStatus,
}

impl SyncResponse {
    /// A run the API itself reports as `failed` is a failed attempt even
    /// though it arrived with a 2xx status.
    pub fn into_result(self) -> Result<SyncResult, SyncError> {
        if self.status == RunStatus::Failed {
            let reason = if self.error_messages.is_empty() {
                "sync run reported failure".to_string()
            } else {
                self.error_messages.join("; ")
            };
            return Err(SyncError::RemoteFailed(reason));
        }
        Ok(SyncResult {
            total_parts: self.total_parts,
            inserted: self.inserted,
            updated: self.updated,
            errors: self.errors,
            duration_seconds: self.duration_seconds,
            version: self.version,
            error_messages: self.error_messages,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|_| ClientError::InvalidUrl(base_url.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub async fn run_sync(&self) -> Result<SyncResponse, ClientError> {
        debug!(url = %self.url(SYNC_PATH), "requesting sync run");
        let response = self.http.post(self.url(SYNC_PATH)).send().await?;
        decode(SYNC_PATH, response).await
    }

    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        decode(path, response).await
    }
}

#[async_trait]
impl RemoteSync for ApiClient {
    async fn sync(&self) -> bomsync_core::Result<SyncResult> {
        self.run_sync().await?.into_result()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

async fn decode<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            path: path.to_string(),
            source,
        });
    }

    let detail = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Status { status, detail })
}
