use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::store::QueueStore;
use crate::errors::AppResult;
use crate::ui::messages;
use tracing::warn;

/// Handle the `init` command
///
/// This initializes:
///  - the config directory (if missing)
///  - the configuration file (skipped in test mode)
///  - the SQLite queue database with all pending migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let db_path = Config::init_all(cli.db.clone(), cli.test)?;
    let db_path = db_path.to_string_lossy().to_string();

    println!("⚙️  Initializing caresync…");
    if !cli.test {
        println!("📄 Config file : {}", Config::config_file().display());
    }
    println!("🗄️  Database   : {}", &db_path);

    let store = QueueStore::open(&db_path)?;

    messages::success(format!("Database initialized at {}", &db_path));

    if let Err(e) = store.audit("init", "", &format!("Database initialized at {}", &db_path)) {
        warn!(error = %e, "failed to write audit log");
    }

    println!("🎉 caresync initialization completed!");
    Ok(())
}
