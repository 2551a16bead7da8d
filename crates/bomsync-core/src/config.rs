use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::activity_log::DEFAULT_LOG_CAPACITY;
use crate::error::{Result, SyncError};
use crate::guard::RevertDelays;
use crate::mode::{normalize_interval, DEFAULT_INTERVAL_SECS};
use crate::types::SyncMode;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PORT: u16 = 3141;

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the sync API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub mode: SyncMode,
    #[serde(default = "default_interval")]
    pub interval_seconds: u32,
    #[serde(default = "default_success_revert")]
    pub success_revert_ms: u64,
    #[serde(default = "default_failure_revert")]
    pub failure_revert_ms: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_interval() -> u32 {
    DEFAULT_INTERVAL_SECS
}

fn default_success_revert() -> u64 {
    2_000
}

fn default_failure_revert() -> u64 {
    3_000
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            mode: SyncMode::default(),
            interval_seconds: default_interval(),
            success_revert_ms: default_success_revert(),
            failure_revert_ms: default_failure_revert(),
            log_capacity: default_log_capacity(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl EngineConfig {
    /// Read a YAML config. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: EngineConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        atomic_write(path, data.as_bytes())
    }

    pub fn validate(&self) -> Result<()> {
        normalize_interval(i64::from(self.interval_seconds))?;
        if self.log_capacity == 0 {
            return Err(SyncError::ConfigInvalid(
                "log_capacity must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SyncError::ConfigInvalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(SyncError::ConfigInvalid("api_url is empty".into()));
        }
        Ok(())
    }

    pub fn revert_delays(&self) -> RevertDelays {
        RevertDelays {
            succeeded: Duration::from_millis(self.success_revert_ms),
            failed: Duration::from_millis(self.failure_revert_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Write through a tempfile in the target directory so a crash never leaves
/// a half-written config behind.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = EngineConfig::load(&dir.path().join("bomsync.yaml")).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.mode, SyncMode::Scheduled);
        assert_eq!(cfg.interval_seconds, 60);
        assert_eq!(cfg.log_capacity, 101);
        assert_eq!(cfg.server.addr(), "127.0.0.1:3141");
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/bomsync.yaml");
        let mut cfg = EngineConfig::default();
        cfg.mode = SyncMode::Live;
        cfg.interval_seconds = 120;
        cfg.server.port = 9000;
        cfg.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bomsync.yaml");
        std::fs::write(&path, "mode: manual\nserver:\n  port: 8080\n").unwrap();

        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.mode, SyncMode::Manual);
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.revert_delays(), RevertDelays::default());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bomsync.yaml");
        std::fs::write(&path, "mode: [not, a, mode]\n").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(SyncError::Yaml(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.interval_seconds = 5;
        assert!(matches!(cfg.validate(), Err(SyncError::ConfigInvalid(_))));

        cfg.interval_seconds = 60;
        cfg.log_capacity = 0;
        assert!(matches!(cfg.validate(), Err(SyncError::ConfigInvalid(_))));
    }
}
