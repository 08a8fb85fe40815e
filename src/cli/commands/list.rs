use crate::config::Config;
use crate::db::store::QueueStore;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREY, RED, RESET, color_for_retries};

pub fn handle(cfg: &Config) -> AppResult<()> {
    let store = QueueStore::open(&cfg.database)?;
    let actions = store.list_all()?;

    if actions.is_empty() {
        println!("No pending actions.");
        return Ok(());
    }

    println!(
        "{}{:>5}  {:<16} {:<24} {:>7}  {:<20}{}",
        CYAN, "ID", "TYPE", "TARGET", "RETRIES", "QUEUED AT", RESET
    );

    for a in &actions {
        let target = match a.decode() {
            Ok(req) => req.target_id().to_string(),
            Err(_) => format!("{RED}<undecodable>{RESET}"),
        };
        println!(
            "{:>5}  {:<16} {:<24} {}{:>7}{}  {}{}{}",
            a.id,
            a.action_type,
            target,
            color_for_retries(a.retry_count, cfg.max_attempts),
            format!("{}/{}", a.retry_count, cfg.max_attempts),
            RESET,
            GREY,
            a.created_at.format("%Y-%m-%d %H:%M:%S"),
            RESET
        );
    }

    println!("\n{} pending action(s)", actions.len());
    Ok(())
}
