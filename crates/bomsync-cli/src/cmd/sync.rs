use std::sync::Arc;

use super::Context;
use crate::output::{print_json, print_table};
use bomsync_client::ApiClient;
use bomsync_core::{Orchestrator, Severity, SyncMode, SyncTriggerSource};

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    config.validate()?;
    let client = ApiClient::from_config(&config)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        // One-shot: no timers, no change subscription, no display refresh.
        let engine = Orchestrator::builder(Arc::new(client))
            .config(&config)
            .mode(SyncMode::Manual)
            .build()?;
        let outcome = engine.trigger(SyncTriggerSource::Manual).await;

        if ctx.json {
            if let Ok(result) = &outcome {
                print_json(result)?;
            }
        } else {
            let rows = engine
                .snapshot()
                .log
                .into_iter()
                .map(|e| vec![e.timestamp, severity_label(e.severity).to_string(), e.message])
                .collect();
            print_table(&["TIME", "LEVEL", "MESSAGE"], rows);
        }

        outcome?;
        Ok::<(), anyhow::Error>(())
    })
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Success => "ok",
        Severity::Warning => "warn",
        Severity::Error => "error",
    }
}
