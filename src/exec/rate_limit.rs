//! Invocation Rate Limiting
//!
//! A sliding one-second window limiter shared by every in-flight execution.
//! The timestamp queue is the only mutable core state in the gateway and is
//! guarded by a `tokio::sync::Mutex`; a task that hits the limit sleeps for
//! the remainder of the window while holding its place in line, which
//! suspends only that task and the callers queued behind it.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics;

/// Sliding-window rate limiter for command invocations.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_calls` per second.
    pub fn new(max_calls: u32) -> Self {
        Self::with_window(max_calls, Duration::from_secs(1))
    }

    /// Create a limiter with a custom window (used by tests).
    pub fn with_window(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1) as usize,
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until an invocation slot is free, then claim it.
    ///
    /// Timestamps older than the window are pruned lazily on each call. When
    /// the window is full the computed wait is `window - (now - oldest)`,
    /// clamped to zero, so the delay is never negative.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        let now = Instant::now();
        while calls
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            calls.pop_front();
        }

        if calls.len() >= self.max_calls {
            if let Some(oldest) = calls.front().copied() {
                let wait = self.window.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    debug!("Rate limit reached, delaying execution by {:?}", wait);
                    metrics::RATE_LIMIT_WAITS_TOTAL.inc();
                    tokio::time::sleep(wait).await;
                }
                // The oldest entry has now aged out of the window.
                calls.pop_front();
            }
        }
        calls.push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_under_limit_is_immediate() {
        let limiter = RateLimiter::new(3);
        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_limit_is_delayed_by_window_remainder() {
        let limiter = RateLimiter::new(2);
        limiter.acquire().await;
        limiter.acquire().await;

        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(900) && elapsed <= Duration::from_millis(1100),
            "unexpected delay: {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spread_calls_are_not_delayed() {
        let limiter = RateLimiter::new(2);
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(600)).await;

        // The first call has aged out of the window by now.
        let start = tokio::time::Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_all_complete() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(2));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn test_zero_max_calls_is_clamped_to_one() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.max_calls, 1);
    }
}
