use crate::config::Config;
use crate::core::engine::SyncEngine;
use crate::errors::AppResult;
use crate::ui::messages;

/// Manual "sync now". The connectivity probe is only advisory, so the
/// drain runs unless the user forced offline mode.
pub async fn handle(cfg: &Config, offline: bool) -> AppResult<()> {
    if offline {
        messages::offline_notice();
        return Ok(());
    }

    let engine = SyncEngine::from_config(cfg, offline)?;
    match engine.orchestrator.sync_now().await? {
        None => messages::info("A sync is already running."),
        Some(report) if !report.is_clean() => {
            messages::info("Run `caresync list` to see what is still queued.");
        }
        Some(_) => {}
    }
    Ok(())
}
