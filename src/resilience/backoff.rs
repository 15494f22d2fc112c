//! Delay schedules between connection attempts.

use std::time::Duration;

/// How long to wait before a given attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay every time.
    Fixed(Duration),
    /// `min(attempt * step, max)`.
    Linear { step: Duration, max: Duration },
}

impl Backoff {
    /// Delay associated with `attempt` (1-based). Attempt 0 never waits.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear { step, max } => step.saturating_mul(attempt).min(max),
        }
    }
}
