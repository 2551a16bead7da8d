mod cmd;
mod output;

use bomsync_core::SyncMode;
use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bomsync",
    about = "Keep the ERP article mirror in step with the BOM store",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to the YAML config (missing file = defaults)
    #[arg(long, global = true, env = "BOMSYNC_CONFIG", default_value = "bomsync.yaml")]
    config: PathBuf,

    /// Base URL of the sync API (overrides the config)
    #[arg(long, global = true, env = "BOMSYNC_API_URL")]
    api_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestration engine and its HTTP API
    Serve {
        /// Initial trigger mode: live, scheduled or manual
        #[arg(long)]
        mode: Option<SyncMode>,
        /// Scheduled-sync interval in seconds (10-300)
        #[arg(long)]
        interval: Option<i64>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one manual sync and print its summary
    Sync,

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let ctx = cmd::Context {
        config_path: cli.config,
        api_url: cli.api_url,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Serve {
            mode,
            interval,
            port,
        } => cmd::serve::run(&ctx, mode, interval, port),
        Commands::Sync => cmd::sync::run(&ctx),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
