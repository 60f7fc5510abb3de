use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Length of the sliding window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window limiter for AI requests.
///
/// The limiter itself is stateless; each user's request log lives in the
/// user's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    max_per_window: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn per_minute(max_per_minute: usize) -> Self {
        Self {
            max_per_window: max_per_minute,
            window: WINDOW,
        }
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    /// Decide whether a request at `now` may proceed.
    ///
    /// Entries older than the window are pruned first, whatever the
    /// outcome. `now` is recorded only when the request is allowed.
    pub fn allow(&self, log: &mut VecDeque<Instant>, now: Instant) -> bool {
        while log
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            log.pop_front();
        }

        if log.len() >= self.max_per_window {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Give back the slot taken by the most recent allowed request, for
    /// attempts rejected before the AI was called.
    pub fn refund(&self, log: &mut VecDeque<Instant>) {
        log.pop_back();
    }
}
