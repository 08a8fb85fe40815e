use crate::db::store::QueueStore;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, GREY, RESET, YELLOW};
use crate::utils::time::describe_last_sync;
use chrono::Utc;
use std::fs;

pub fn print_db_info(store: &QueueStore) -> AppResult<()> {
    let db_path = store.path().unwrap_or(":memory:");
    println!();

    //
    // 1) FILE SIZE
    //
    let file_size = fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);
    let file_kb = (file_size as f64) / 1024.0;

    println!("{}• File:{} {}{}{}", CYAN, RESET, YELLOW, db_path, RESET);
    println!("{}• Size:{} {:.1} KB", CYAN, RESET, file_kb);

    //
    // 2) PENDING ACTIONS PER TYPE
    //
    let total = store.pending_count()?;
    println!(
        "{}• Pending actions:{} {}{}{}",
        CYAN, RESET, GREEN, total, RESET
    );
    for (action_type, count) in store.count_by_type()? {
        println!("    {:<16} {}", action_type, count);
    }

    //
    // 3) OLDEST / NEWEST
    //
    let actions = store.list_all()?;
    let fmt = |a: Option<&crate::models::PendingAction>| {
        a.map(|a| a.created_at.to_rfc3339())
            .unwrap_or_else(|| format!("{GREY}--{RESET}"))
    };
    println!("{}• Queued between:{}", CYAN, RESET);
    println!("    from: {}", fmt(actions.first()));
    println!("    to:   {}", fmt(actions.last()));

    //
    // 4) LAST SYNC
    //
    println!(
        "{}• Last sync:{} {}",
        CYAN,
        RESET,
        describe_last_sync(store.get_last_sync()?, Utc::now())
    );

    println!();
    Ok(())
}
