use super::Context;
use crate::output::print_json;
use bomsync_core::EngineConfig;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective config (file + overrides)
    Show,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(ctx: &Context, subcommand: ConfigSubcommand) -> anyhow::Result<()> {
    match subcommand {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Init { force } => init(ctx, force),
    }
}

fn show(ctx: &Context) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    if ctx.json {
        print_json(&config)
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        Ok(())
    }
}

fn init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let mut config = EngineConfig::default();
    if let Some(url) = &ctx.api_url {
        config.api_url = url.clone();
    }
    config.save(path)?;
    if ctx.json {
        print_json(&serde_json::json!({ "written": path }))
    } else {
        println!("Wrote {}", path.display());
        Ok(())
    }
}
