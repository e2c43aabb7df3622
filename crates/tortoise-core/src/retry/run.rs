//! Short fixed schedule for re-attempting the same unit of work.

use std::time::Duration;

/// How often, and how far apart, a single unit of work is re-attempted after
/// a retryable failure. This is distinct from the exponential pacing delay,
/// which spaces out *different* units of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAttemptPolicy {
    /// Total attempts per unit of work, including the first.
    pub max_attempts: u32,
    /// Wait before attempt `n + 1` is `delays[n - 1]`; the last entry repeats.
    pub delays: Vec<Duration>,
}

impl Default for SubAttemptPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays: vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(15),
            ],
        }
    }
}

impl SubAttemptPolicy {
    /// Wait to apply after failed attempt `attempt` (1-based), or `None` when
    /// the attempt budget is spent.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let idx = (attempt.saturating_sub(1) as usize).min(self.delays.len().saturating_sub(1));
        Some(self.delays.get(idx).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_is_five_then_ten() {
        let p = SubAttemptPolicy::default();
        assert_eq!(p.delay_after(1), Some(Duration::from_secs(5)));
        assert_eq!(p.delay_after(2), Some(Duration::from_secs(10)));
        assert_eq!(p.delay_after(3), None);
    }

    #[test]
    fn last_delay_repeats_when_schedule_is_short() {
        let p = SubAttemptPolicy {
            max_attempts: 5,
            delays: vec![Duration::from_secs(1), Duration::from_secs(2)],
        };
        assert_eq!(p.delay_after(3), Some(Duration::from_secs(2)));
        assert_eq!(p.delay_after(4), Some(Duration::from_secs(2)));
    }

    #[test]
    fn empty_schedule_retries_immediately() {
        let p = SubAttemptPolicy {
            max_attempts: 2,
            delays: Vec::new(),
        };
        assert_eq!(p.delay_after(1), Some(Duration::ZERO));
    }
}
