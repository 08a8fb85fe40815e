use crate::config::Config;
use crate::core::connectivity::ConnectivityMonitor;
use crate::core::engine::SyncEngine;
use crate::errors::AppResult;
use crate::ui::messages;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Long-running mode: drain on startup, on every reconnect, and report
/// queue depth changes until Ctrl-C.
pub async fn handle(cfg: &Config, offline: bool) -> AppResult<()> {
    let engine = SyncEngine::from_config(cfg, offline)?;
    let monitor = ConnectivityMonitor::detect(engine.source.as_ref()).await;

    messages::header(format!("caresync watching {}", cfg.api_base_url));
    if monitor.is_online() {
        messages::info("Online.");
    } else {
        messages::offline_notice();
    }

    let _subscription = engine.orchestrator.attach(&monitor);
    let watcher = monitor.spawn_watcher(
        Arc::clone(&engine.source),
        cfg.probe_interval(),
        cfg.debounce(),
    );

    if monitor.is_online()
        && let Err(e) = engine.orchestrator.sync_if_pending().await
    {
        messages::error(format!("Startup sync failed: {e}"));
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut poll = tokio::time::interval(cfg.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_depth: Option<usize> = None;

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                break;
            }
            _ = poll.tick() => match engine.orchestrator.pending_count() {
                Ok(depth) => {
                    if last_depth != Some(depth) {
                        info!(pending = depth, "queue depth changed");
                        messages::info(format!("{} change(s) pending", depth));
                        last_depth = Some(depth);
                    }
                }
                // Transient (e.g. busy database); try again on the next tick.
                Err(e) => warn!(error = %e, "queue depth poll failed"),
            }
        }
    }

    watcher.abort();
    messages::info("Stopped watching.");
    Ok(())
}
