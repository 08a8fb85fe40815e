//! caresync library root.
//! Exposes the CLI parser, the high-level `run()` function and the sync engine.

pub mod cli;
pub mod config;
pub mod core;
pub mod db;
pub mod errors;
pub mod models;
pub mod ui;
pub mod utils;

use clap::Parser;
use cli::parser::{Cli, Commands};
use config::Config;
use errors::AppResult;
use tracing_subscriber::EnvFilter;
use utils::path::resolve_in;

/// Central command dispatcher
pub async fn dispatch(cli: &Cli, cfg: &Config) -> AppResult<()> {
    match &cli.command {
        Commands::Init => cli::commands::init::handle(cli),
        Commands::Config { .. } => cli::commands::config::handle(&cli.command, cfg),
        Commands::Enqueue { action } => {
            cli::commands::enqueue::handle(action, cfg, cli.offline).await
        }
        Commands::List => cli::commands::list::handle(cfg),
        Commands::Status => cli::commands::status::handle(cfg, cli.offline).await,
        Commands::Sync => cli::commands::sync::handle(cfg, cli.offline).await,
        Commands::Watch => cli::commands::watch::handle(cfg, cli.offline).await,
        Commands::Db { .. } => cli::commands::db::handle(&cli.command, cfg),
        Commands::Log { .. } => cli::commands::log::handle(&cli.command, cfg),
    }
}

/// Console diagnostics go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "caresync=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Effective configuration: file (skipped in test mode) plus CLI overrides.
pub fn effective_config(cli: &Cli) -> AppResult<Config> {
    let mut cfg = if cli.test {
        Config::default()
    } else {
        Config::load()?
    };

    if let Some(custom_db) = &cli.db {
        cfg.database = resolve_in(&Config::config_dir(), custom_db)
            .to_string_lossy()
            .to_string();
    }
    if let Some(url) = &cli.api_url {
        cfg.api_base_url = url.clone();
        cfg.validate()?;
    }
    Ok(cfg)
}

/// Entry point used by main.rs
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = effective_config(&cli)?;
    dispatch(&cli, &cfg).await
}
