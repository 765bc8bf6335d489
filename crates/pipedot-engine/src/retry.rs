//! Exponential backoff with jitter (§4.6): base 500 ms, factor 2, cap 30 s.

use rand::Rng;
use std::time::Duration;

const BASE_MS: u64 = 500;
const FACTOR: u32 = 2;
const CAP_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Per-node `max_retries` overrides the engine default when present.
    pub fn for_node(node_max_retries: Option<u32>, engine_default: u32) -> Self {
        Self::new(node_max_retries.unwrap_or(engine_default))
    }

    pub fn allows_attempt(&self, attempt: u32) -> bool {
        attempt <= self.max_retries
    }

    /// Delay before the given retry attempt (1-indexed), with jitter applied
    /// on top of the exponential base so concurrent retries don't thunder.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = BASE_MS.saturating_mul(FACTOR.saturating_pow(attempt.saturating_sub(1)) as u64);
        let capped = exp.min(CAP_MS);
        let jitter = rand::thread_rng().gen_range(0..=capped / 4 + 1);
        Duration::from_millis(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::new(10);
        assert!(policy.backoff(1).as_millis() >= 500);
        assert!(policy.backoff(2).as_millis() >= 1000);
        assert!(policy.backoff(20).as_millis() <= 30_000 + 7_500 + 1);
    }

    #[test]
    fn node_override_takes_precedence() {
        let policy = RetryPolicy::for_node(Some(5), 2);
        assert_eq!(policy.max_retries, 5);
        let fallback = RetryPolicy::for_node(None, 2);
        assert_eq!(fallback.max_retries, 2);
    }

    #[test]
    fn allows_attempt_respects_budget() {
        let policy = RetryPolicy::new(2);
        assert!(policy.allows_attempt(1));
        assert!(policy.allows_attempt(2));
        assert!(!policy.allows_attempt(3));
    }
}
