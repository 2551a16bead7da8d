use super::Context;
use bomsync_core::SyncMode;

pub fn run(
    ctx: &Context,
    mode: Option<SyncMode>,
    interval: Option<i64>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(interval) = interval {
        config.interval_seconds = u32::try_from(interval)
            .map_err(|_| anyhow::anyhow!("interval must be 10-300 seconds, got {interval}"))?;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        mode = %config.mode,
        interval_seconds = config.interval_seconds,
        api_url = %config.api_url,
        "starting bomsync"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(bomsync_server::serve(config))
}
