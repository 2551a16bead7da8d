pub mod config;
pub mod serve;
pub mod sync;

use anyhow::Context as _;
use bomsync_core::EngineConfig;
use std::path::PathBuf;

/// Global flags shared by every subcommand.
pub struct Context {
    pub config_path: PathBuf,
    pub api_url: Option<String>,
    pub json: bool,
}

impl Context {
    /// Config file contents with the global overrides applied.
    pub fn load_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = EngineConfig::load(&self.config_path)
            .with_context(|| format!("loading {}", self.config_path.display()))?;
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        Ok(config)
    }
}
