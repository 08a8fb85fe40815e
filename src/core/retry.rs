/// Bounded retry budget for queued actions.
///
/// Every failed dispatch counts, whatever the cause: a 4xx that can never
/// succeed and a timeout that might are charged the same. There is no
/// backoff between attempts; pacing comes from how often a drain runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `failed_attempts` includes the failure that just happened.
    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_failure_exhausts_default_budget() {
        let p = RetryPolicy::default();
        assert!(p.should_retry(1));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3));
        assert!(!p.should_retry(4));
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        assert!(!RetryPolicy::new(1).should_retry(1));
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
