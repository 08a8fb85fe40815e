//! Time utilities: human-readable ages for the status screens.

use chrono::{DateTime, Utc};

/// Render the last-sync marker relative to `now`, e.g. "12 min ago".
pub fn describe_last_sync(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last {
        None => "never".to_string(),
        Some(ts) => format!("{} ({})", format_age(now - ts), ts.format("%Y-%m-%d %H:%M:%S UTC")),
    }
}

pub fn format_age(age: chrono::Duration) -> String {
    let secs = age.num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let mins = age.num_minutes();
    if mins < 60 {
        return format!("{} min ago", mins);
    }
    let hours = age.num_hours();
    if hours < 24 {
        return format!("{} h ago", hours);
    }
    let days = age.num_days();
    if days == 1 {
        "1 day ago".to_string()
    } else {
        format!("{} days ago", days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ages_are_bucketed() {
        assert_eq!(format_age(Duration::seconds(5)), "just now");
        assert_eq!(format_age(Duration::minutes(12)), "12 min ago");
        assert_eq!(format_age(Duration::hours(3)), "3 h ago");
        assert_eq!(format_age(Duration::hours(30)), "1 day ago");
        assert_eq!(format_age(Duration::days(4)), "4 days ago");
    }

    #[test]
    fn missing_marker_reads_never() {
        assert_eq!(describe_last_sync(None, Utc::now()), "never");
    }
}
