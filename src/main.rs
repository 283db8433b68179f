use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use group_setup_server::config::{AppConfig, CliConfig, FileConfig};
use group_setup_server::{load_catalog, App};

mod demo;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(version)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Name of the workflow definition new cases are bound to.
    #[clap(long)]
    pub definition_name: Option<String>,

    /// Path to a JSON workflow definition to use instead of the built-in one.
    #[clap(long, value_parser = parse_path)]
    pub definition: Option<PathBuf>,

    /// Do not record events in the audit log.
    #[clap(long)]
    pub no_audit: bool,

    /// Do not send handoff notifications.
    #[clap(long)]
    pub no_notifications: bool,

    /// Drive a sample case through the whole online setup and print the
    /// resulting servicing payload.
    #[clap(long)]
    pub demo: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            definition_name: self.definition_name.clone(),
            definition_path: self.definition.clone(),
            disable_audit: self.no_audit,
            disable_notifications: self.no_notifications,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(
        "group-setup-server {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let catalog = Arc::new(load_catalog(&config)?);
    let definition = catalog
        .active(&config.definition_name)?
        .with_context(|| format!("No active definition named {}", config.definition_name))?;
    info!(
        "Workflow {} v{} ready with {} steps",
        definition.name,
        definition.version,
        definition.steps.len()
    );

    let app = App::build(&config, catalog);

    if cli_args.demo {
        let payload = demo::run(&app).await?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&definition)?);
    }

    Ok(())
}
