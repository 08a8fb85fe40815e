use crate::config::Config;
use crate::core::engine::SyncEngine;
use crate::core::orchestrator::SyncState;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, RESET, YELLOW, color_for_connectivity};
use crate::utils::time::describe_last_sync;
use chrono::Utc;

pub async fn handle(cfg: &Config, offline: bool) -> AppResult<()> {
    let engine = SyncEngine::from_config(cfg, offline)?;
    let online = engine.probe().await;
    let o = &engine.orchestrator;

    let network = if online { "online" } else { "offline" };
    let state = match o.state() {
        SyncState::Idle => "idle",
        SyncState::Syncing => "syncing",
    };

    println!(
        "{}• Network:{}   {}{}{}",
        CYAN,
        RESET,
        color_for_connectivity(online),
        network,
        RESET
    );
    println!("{}• API:{}       {}", CYAN, RESET, cfg.api_base_url);
    println!(
        "{}• Pending:{}   {}{}{}",
        CYAN,
        RESET,
        YELLOW,
        o.pending_count()?,
        RESET
    );
    println!(
        "{}• Last sync:{} {}",
        CYAN,
        RESET,
        describe_last_sync(o.last_sync()?, Utc::now())
    );
    println!("{}• Sync:{}      {}", CYAN, RESET, state);
    Ok(())
}
