//! Outbound API rate limiting
//!
//! Tracks grant timestamps in a trailing 60-second window. Entries older
//! than the window are pruned lazily on each acquire. The limiter is shared
//! between worker invocations and guarded by a single mutex; it is called
//! from blocking context (the correction client runs in `spawn_blocking`).

use crate::config::{OnLimit, RateLimitConfig};
use crate::error::CorrectionError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Trailing window length
const WINDOW: Duration = Duration::from_secs(60);

/// Per-minute request limiter
pub struct RateLimiter {
    ceiling: usize,
    on_limit: OnLimit,
    window: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            ceiling: config.requests_per_minute as usize,
            on_limit: config.on_limit,
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Permit a request now, or handle a full window per the configured
    /// policy: block until a slot frees (Wait) or fail fast with a
    /// retry-after hint (Fail).
    pub fn acquire(&self) -> Result<(), CorrectionError> {
        loop {
            match self.try_acquire_at(Instant::now()) {
                Ok(()) => return Ok(()),
                Err(wait) => match self.on_limit {
                    OnLimit::Wait => {
                        tracing::warn!(
                            "Rate limit reached, waiting {:.2}s",
                            wait.as_secs_f64()
                        );
                        std::thread::sleep(wait);
                    }
                    OnLimit::Fail => {
                        return Err(CorrectionError::RateLimited {
                            retry_after: wait.as_secs_f64(),
                        });
                    }
                },
            }
        }
    }

    /// Core window logic: prune stale entries, then grant or compute the
    /// wait until the oldest entry leaves the window.
    fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut window = self.window.lock().expect("rate window poisoned");

        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) > WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.ceiling {
            window.push_back(now);
            return Ok(());
        }

        // Window full. The wait is bounded by WINDOW by construction.
        let oldest = *window.front().expect("full window has a front");
        Err(WINDOW.saturating_sub(now.duration_since(oldest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rpm: u32, on_limit: OnLimit) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            requests_per_minute: rpm,
            on_limit,
        })
    }

    #[test]
    fn test_grants_up_to_ceiling() {
        let limiter = limiter(3, OnLimit::Fail);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.try_acquire_at(now).is_ok());
        }
        assert!(limiter.try_acquire_at(now).is_err());
    }

    #[test]
    fn test_excess_call_waits_for_oldest_entry() {
        let limiter = limiter(2, OnLimit::Fail);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start).is_ok());
        assert!(limiter.try_acquire_at(start + Duration::from_secs(10)).is_ok());

        // Third call at t=20s: oldest entry is at t=0, so the slot frees at
        // t=60s and the computed wait is 40s.
        let wait = limiter
            .try_acquire_at(start + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(40));
    }

    #[test]
    fn test_stale_entries_are_pruned() {
        let limiter = limiter(1, OnLimit::Fail);
        let start = Instant::now();

        assert!(limiter.try_acquire_at(start).is_ok());
        assert!(limiter.try_acquire_at(start + Duration::from_secs(1)).is_err());

        // Past the window, the old grant no longer counts.
        assert!(limiter.try_acquire_at(start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_fail_mode_reports_retry_after() {
        let limiter = limiter(1, OnLimit::Fail);
        assert!(limiter.acquire().is_ok());
        match limiter.acquire() {
            Err(CorrectionError::RateLimited { retry_after }) => {
                assert!(retry_after > 0.0 && retry_after <= 60.0);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }
}
