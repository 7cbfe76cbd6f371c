//! Shared fetch gate enforcing a minimum inter-call interval.
//!
//! Every feed call site in a batch shares one gate so upstream providers see
//! at most one request per interval regardless of how many tickers are being
//! analyzed concurrently. The gate is the only shared mutable resource in the
//! engine; the underlying limiter keeps a monotonic state safe under
//! concurrent access.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Injectable throttling gate shared by all fetch call sites.
#[derive(Clone)]
pub struct FetchGate {
    limiter: Option<Arc<DirectRateLimiter>>,
    min_interval: Duration,
}

impl FetchGate {
    /// Gate admitting one call per `min_interval`. A zero interval builds an
    /// unthrottled gate.
    pub fn with_min_interval(min_interval: Duration) -> Self {
        if min_interval.is_zero() {
            return Self::unthrottled();
        }

        let quota = Quota::with_period(min_interval)
            .expect("non-zero interval yields a valid quota")
            .allow_burst(NonZeroU32::new(1).expect("burst of one is non-zero"));

        Self {
            limiter: Some(Arc::new(RateLimiter::direct(quota))),
            min_interval,
        }
    }

    /// Gate sized from a calls-per-minute budget, the usual way provider
    /// quotas are published.
    pub fn per_minute(calls_per_minute: u32) -> Self {
        let safe = calls_per_minute.max(1);
        Self::with_min_interval(Duration::from_secs_f64(60.0 / f64::from(safe)))
    }

    /// Gate that admits every call immediately. Intended for tests and
    /// fixture-backed runs where no provider quota applies.
    pub fn unthrottled() -> Self {
        Self {
            limiter: None,
            min_interval: Duration::ZERO,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Tries to acquire call budget without waiting. On denial returns the
    /// recommended wait before retrying (the gate's own interval; the actual
    /// remaining wait is never longer).
    pub fn try_acquire(&self) -> Result<(), Duration> {
        match &self.limiter {
            None => Ok(()),
            Some(limiter) => limiter.check().map_err(|_| self.min_interval),
        }
    }

    /// Waits until the gate admits the call.
    pub async fn admit(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    let wait = wait.max(Duration::from_millis(1));
                    tracing::trace!(wait_ms = wait.as_millis() as u64, "fetch gate saturated");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for FetchGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchGate")
            .field("min_interval", &self.min_interval)
            .field("throttled", &self.limiter.is_some())
            .finish()
    }
}
