use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::store::QueueStore;
use crate::errors::AppResult;
use crate::utils::colors::{CYAN, GREEN, MAGENTA, RED, RESET, YELLOW};

const OP_TARGET_MAX: usize = 40;

/// ANSI color per audited operation
fn color_for_operation(op: &str) -> &'static str {
    match op {
        "enqueue" => CYAN,
        "sync" => GREEN,
        "drop" => RED,
        "init" => YELLOW,
        "migration_applied" => MAGENTA,
        _ => RESET,
    }
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if !matches!(cmd, Commands::Log { print: true }) {
        return Ok(());
    }

    let store = QueueStore::open(&cfg.database)?;
    let entries = store.audit_entries()?;

    if entries.is_empty() {
        println!("📜 Internal log is empty.");
        return Ok(());
    }

    let id_w = entries
        .iter()
        .map(|e| e.id.to_string().len())
        .max()
        .unwrap_or(1);

    let rows: Vec<(String, String)> = entries
        .iter()
        .map(|e| {
            let date = chrono::DateTime::parse_from_rfc3339(&e.date)
                .map(|dt| dt.format("%FT%T%:z").to_string())
                .unwrap_or_else(|_| e.date.clone());
            let target = if e.target.is_empty() {
                String::new()
            } else {
                format!(" ({})", e.target)
            };
            (date, target)
        })
        .collect();

    let date_w = rows.iter().map(|(d, _)| d.len()).max().unwrap_or(10);
    let op_w = entries
        .iter()
        .zip(&rows)
        .map(|(e, (_, t))| e.operation.chars().count() + t.chars().count())
        .max()
        .unwrap_or(10)
        .min(OP_TARGET_MAX);

    println!("📜 Internal log:\n");

    for (e, (date, target)) in entries.iter().zip(rows) {
        let visible = e.operation.chars().count() + target.chars().count();
        let target = if visible > OP_TARGET_MAX {
            let keep = OP_TARGET_MAX.saturating_sub(e.operation.chars().count() + 3);
            format!("{}...", target.chars().take(keep).collect::<String>())
        } else {
            target
        };
        let shown = e.operation.chars().count() + target.chars().count();
        let padding = " ".repeat(op_w.saturating_sub(shown));

        println!(
            "{:>id_w$}: {:<date_w$} | {}{}{}{}{} => {}",
            e.id,
            date,
            color_for_operation(&e.operation),
            e.operation,
            RESET,
            target,
            padding,
            e.message,
            id_w = id_w,
            date_w = date_w
        );
    }

    Ok(())
}
