use crate::cli::parser::Commands;
use crate::config::Config;
use crate::config::migrate::{migrate_config_file, missing_keys};
use crate::errors::{AppError, AppResult};
use crate::ui::messages;

/// Handle the `config` subcommand
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Config {
        print_config,
        check,
        migrate,
    } = cmd
    {
        let path = Config::config_file();

        // ---- PRINT CONFIG ----
        if *print_config {
            println!("📄 Current configuration:\n");
            let shown = Config {
                api_token: cfg.api_token.as_ref().map(|_| "********".to_string()),
                ..cfg.clone()
            };
            let yaml = serde_yaml::to_string(&shown).map_err(|_| AppError::ConfigSave)?;
            println!("{}", yaml);
        }

        // ---- CHECK ----
        if *check {
            if !path.exists() {
                messages::warning(format!(
                    "No configuration file at {} (defaults in use). Run `caresync init`.",
                    path.display()
                ));
            } else {
                let missing = missing_keys(&path)?;
                if missing.is_empty() {
                    messages::success("Configuration file is complete.");
                } else {
                    messages::warning(format!(
                        "Missing fields: {} (run `caresync config --migrate`)",
                        missing.join(", ")
                    ));
                }
            }
        }

        // ---- MIGRATE ----
        if *migrate {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "no configuration file at {}",
                    path.display()
                )));
            }
            let changed = migrate_config_file(&path)?;
            if changed.is_empty() {
                messages::info("Configuration already up to date.");
            } else {
                for c in &changed {
                    println!("  + {}", c);
                }
                messages::success(format!("Configuration migrated: {}", path.display()));
            }
        }
    }

    Ok(())
}
