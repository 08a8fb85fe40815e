/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const MAGENTA: &str = "\x1b[35m";

/// Online → green, offline → red.
pub fn color_for_connectivity(online: bool) -> &'static str {
    if online { GREEN } else { RED }
}

/// Retry counter color: 0 → reset, below the ceiling → yellow, at the
/// last attempt → red.
pub fn color_for_retries(retry_count: u32, max_attempts: u32) -> &'static str {
    if retry_count == 0 {
        RESET
    } else if retry_count + 1 >= max_attempts {
        RED
    } else {
        YELLOW
    }
}
