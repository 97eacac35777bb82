//! Sliding-window rate limiter shared by every classification worker.
//!
//! The limiter grants at most `limit` permits in any trailing `window`. The
//! timestamps of recent grants live behind a `tokio::sync::Mutex` and are
//! never handed out; callers only see [`RateLimiter::acquire`]. The
//! prune-check-record step runs under the lock, so two callers can never both
//! take the last free slot. The lock is released before sleeping.
//!
//! Time comes from `tokio::time`, so tests can run the window with paused time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::ConfigError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcquireError {
    #[error("permit wait cancelled")]
    Cancelled,

    #[error("no permit available within {waited:?}")]
    TimedOut { waited: Duration },
}

/// Grant timestamps within (roughly) the current window, oldest first.
#[derive(Debug, Default)]
struct RateWindow {
    stamps: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.stamps.front() {
            if now.duration_since(oldest) >= window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until the oldest live grant leaves the window. Saturates at
    /// `Duration::MAX` when the expiry is past what `Instant` can represent.
    fn next_free_in(&self, now: Instant, window: Duration) -> Duration {
        self.stamps
            .front()
            .map(|&oldest| {
                oldest
                    .checked_add(window)
                    .map_or(Duration::MAX, |expiry| expiry.saturating_duration_since(now))
            })
            .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateWindow>,
    limit: usize,
    period: Duration,
    max_wait: Option<Duration>,
    granted: AtomicU64,
}

impl RateLimiter {
    /// `limit` permits per `period`. With `max_wait`, a caller that would have
    /// to wait longer than that in total gets [`AcquireError::TimedOut`].
    pub fn new(
        limit: usize,
        period: Duration,
        max_wait: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        if period.is_zero() || Instant::now().checked_add(period).is_none() {
            return Err(ConfigError::InvalidWindow);
        }
        Ok(Self {
            window: Mutex::new(RateWindow {
                stamps: VecDeque::with_capacity(limit),
            }),
            limit,
            period,
            max_wait,
            granted: AtomicU64::new(0),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Total permits granted since construction.
    pub fn grants(&self) -> u64 {
        self.granted.load(Ordering::Relaxed)
    }

    /// Wait for a permit.
    ///
    /// Returns immediately while the window has room. Otherwise sleeps until
    /// the oldest grant expires and checks again, since other waiters may
    /// have taken the slot first. Cancelling `cancel` aborts the wait.
    #[instrument(level = "debug", skip_all)]
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), AcquireError> {
        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }

            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                window.prune(now, self.period);
                if window.stamps.len() < self.limit {
                    window.stamps.push_back(now);
                    self.granted.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                window.next_free_in(now, self.period)
            };

            if let Some(max_wait) = self.max_wait {
                let waited = started.elapsed();
                if waited.saturating_add(wait) > max_wait {
                    warn!(?waited, ?wait, ?max_wait, "Rate budget exhausted; giving up on permit");
                    return Err(AcquireError::TimedOut { waited });
                }
            }

            debug!(?wait, limit = self.limit, "Rate window full; waiting for a slot");
            // Waiters woken by the same expiry race for the lock in no particular order.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
                _ = sleep(wait) => {}
            }
        }
    }
}
