use crate::models::action::MedicationStatus;
use clap::{Parser, Subcommand};

/// Command-line interface definition for caresync
/// Offline-first action queue for the caregiving API
#[derive(Parser)]
#[command(
    name = "caresync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Queue caregiver actions while offline and sync them to the care API when the connection returns",
    long_about = None
)]
pub struct Cli {
    /// Override database path (useful for tests or custom DB)
    #[arg(global = true, long = "db")]
    pub db: Option<String>,

    /// Override the API base URL from the configuration
    #[arg(global = true, long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Treat the network as unavailable (actions are only queued)
    #[arg(global = true, long = "offline")]
    pub offline: bool,

    /// Run in test mode (no config file read or update)
    #[arg(global = true, long = "test", hide = true)]
    pub test: bool,

    /// Print sync diagnostics (info-level logging)
    #[arg(global = true, short = 'v', long = "verbose")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and configuration
    Init,

    /// Inspect or upgrade the configuration file
    Config {
        #[arg(long = "print", help = "Print the effective configuration")]
        print_config: bool,

        #[arg(long = "check", help = "Check configuration file for missing fields")]
        check: bool,

        #[arg(long = "migrate", help = "Run configuration file migrations if needed")]
        migrate: bool,
    },

    /// Queue a caregiver action (synced right away when online)
    Enqueue {
        #[command(subcommand)]
        action: EnqueueAction,
    },

    /// List pending actions in the order they will be sent
    List,

    /// Show connectivity, queue depth and last sync
    Status,

    /// Send all pending actions now
    Sync,

    /// Stay running and sync whenever the connection comes back
    Watch,

    /// Manage the database (migrations, integrity checks, etc.)
    Db {
        #[arg(long = "migrate", help = "Run pending database migrations")]
        migrate: bool,

        #[arg(long = "check", help = "Check database integrity")]
        check: bool,

        #[arg(long = "vacuum", help = "Optimize the database using VACUUM")]
        vacuum: bool,

        #[arg(long = "info", help = "Show database information")]
        info: bool,
    },

    /// Print or manage the internal log table
    Log {
        #[arg(long = "print", help = "Print rows from the internal log table")]
        print: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum EnqueueAction {
    /// Record a medication administration
    MedicationLog {
        /// Medication id on the server
        medication_id: String,

        #[arg(long, value_enum)]
        status: MedicationStatus,

        /// Scheduled dose time (RFC 3339, e.g. 2026-03-01T08:00:00Z)
        #[arg(long = "scheduled")]
        scheduled: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Add an entry to a care recipient's timeline
    TimelineEntry {
        /// Care recipient id on the server
        care_recipient_id: String,

        /// Entry type (note, meal, mood, incident, ...)
        #[arg(long = "type", default_value = "note")]
        entry_type: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,
    },

    /// Check in to a shift
    ShiftCheckin {
        shift_id: String,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Check out of a shift
    ShiftCheckout {
        shift_id: String,

        #[arg(long)]
        notes: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },
}
