//! Aggregate consumption rate limiting.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct Window {
    started: Instant,
    used: u32,
}

/// Fixed-window limiter shared by every worker.
///
/// Caps aggregate throughput across the pool, not per worker: whichever
/// worker asks first consumes from the same one-second window, bounding
/// downstream write pressure regardless of concurrency.
pub struct RateLimiter {
    max_per_sec: u32,
    window: Mutex<Window>,
}

impl RateLimiter {
    /// `max_per_sec` of 0 is treated as 1; a zero cap would never admit work.
    #[must_use]
    pub fn new(max_per_sec: u32) -> Self {
        Self {
            max_per_sec: max_per_sec.max(1),
            window: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Waits until the current window has capacity, then consumes one slot.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                if now.duration_since(window.started) >= Duration::from_secs(1) {
                    window.started = now;
                    window.used = 0;
                }
                if window.used < self.max_per_sec {
                    window.used += 1;
                    return;
                }
                Duration::from_secs(1).saturating_sub(now.duration_since(window.started))
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_cap_without_waiting() {
        let limiter = RateLimiter::new(10);
        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "first window should admit the full cap immediately"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delays_once_cap_is_exhausted() {
        let limiter = RateLimiter::new(2);
        limiter.acquire().await;
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(
            start.elapsed() >= Duration::from_millis(900),
            "third acquire should wait for the next window"
        );
    }

    #[tokio::test]
    async fn zero_cap_is_clamped_to_one() {
        let limiter = RateLimiter::new(0);
        limiter.acquire().await;
    }
}
