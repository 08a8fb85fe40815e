use crate::models::sync_report::DrainReport;
use std::fmt;

/// ANSI colors
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

const FG_BLUE: &str = "\x1b[34m";
const FG_GREEN: &str = "\x1b[32m";
const FG_YELLOW: &str = "\x1b[33m";
const FG_RED: &str = "\x1b[31m";

/// Icons
const ICON_INFO: &str = "ℹ️";
const ICON_OK: &str = "✅";
const ICON_WARN: &str = "⚠️";
const ICON_ERR: &str = "❌";
const ICON_OFFLINE: &str = "📴";

pub fn info<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_BLUE, BOLD, ICON_INFO, RESET, msg);
}

pub fn success<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_GREEN, BOLD, ICON_OK, RESET, msg);
}

pub fn warning<T: fmt::Display>(msg: T) {
    println!("{}{}{} {}{}", FG_YELLOW, BOLD, ICON_WARN, RESET, msg);
}

pub fn error<T: fmt::Display>(msg: T) {
    eprintln!("{}{}{} {}{}", FG_RED, BOLD, ICON_ERR, RESET, msg);
}

/// Optional: formatted section header
pub fn header<T: fmt::Display>(msg: T) {
    println!("{}{}====================== {}\n{}", FG_BLUE, BOLD, msg, RESET);
}

/// Shown while offline: new actions are stored, not applied.
pub fn offline_notice() {
    println!(
        "{}{}{} {}You're offline. New changes will be queued and synced when the connection returns.",
        FG_YELLOW, BOLD, ICON_OFFLINE, RESET
    );
}

/// One line per non-zero counter of the drain.
pub fn drain_outcome(report: &DrainReport) {
    if report.is_empty() {
        info("Nothing to sync.");
        return;
    }
    if report.synced > 0 {
        success(format!(
            "Synced {} {}",
            report.synced,
            changes(report.synced)
        ));
    }
    if report.failed > 0 {
        error(format!(
            "{} {} failed to sync",
            report.failed,
            changes(report.failed)
        ));
    }
    if report.retained > 0 {
        warning(format!(
            "{} {} will be retried",
            report.retained,
            changes(report.retained)
        ));
    }
    if report.skipped > 0 {
        error(format!(
            "{} {} could not be read and stay queued",
            report.skipped,
            changes(report.skipped)
        ));
    }
}

fn changes(n: usize) -> &'static str {
    if n == 1 { "change" } else { "changes" }
}
