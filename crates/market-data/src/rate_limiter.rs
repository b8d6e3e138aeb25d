//! Token bucket rate limiter shared by every outbound call.
//!
//! The bucket is a pool of at most `capacity` tokens (capacity equals the
//! configured requests per second). A background task adds one token every
//! `1s / rate`; a tick that finds the pool full is discarded, so the pool
//! never overflows. Acquiring a token consumes it for good.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{Semaphore, TryAcquireError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::context::RequestContext;
use crate::errors::{MarketDataError, Result};

/// Highest supported rate: one token per nanosecond.
pub const MAX_REQUESTS_PER_SECOND: u32 = 1_000_000_000;

/// Proof that one rate token was taken from the bucket.
///
/// Tokens are not returned when the permit is dropped; only the refill
/// task puts tokens back.
#[derive(Debug)]
#[must_use]
pub struct RatePermit {
    _private: (),
}

/// One generation of the bucket. Replaced wholesale on reconfiguration.
#[derive(Debug)]
struct TokenBucket {
    tokens: Arc<Semaphore>,
    capacity: usize,
    interval: Duration,
    refill_stop: CancellationToken,
}

impl TokenBucket {
    /// Create a bucket holding `initial` tokens (capped at capacity) and
    /// start its refill task.
    fn start(requests_per_second: u32, initial: usize, shutdown: &CancellationToken) -> Arc<Self> {
        let capacity = requests_per_second as usize;
        let interval = Duration::from_secs(1) / requests_per_second;
        let bucket = Arc::new(Self {
            tokens: Arc::new(Semaphore::new(initial.min(capacity))),
            capacity,
            interval,
            refill_stop: shutdown.child_token(),
        });

        tokio::spawn(refill(
            Arc::clone(&bucket.tokens),
            capacity,
            interval,
            bucket.refill_stop.clone(),
        ));

        bucket
    }

    /// Stop refilling and wake every waiter so it can move on.
    fn retire(&self) {
        self.refill_stop.cancel();
        self.tokens.close();
    }
}

/// Refill loop: one token per tick, dropped when the pool is full.
async fn refill(
    tokens: Arc<Semaphore>,
    capacity: usize,
    interval: Duration,
    stop: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => add_token(&tokens, capacity),
        }
    }

    debug!("Rate limiter: refill task stopped");
}

// Only the refill task adds tokens, so the check cannot race another add.
fn add_token(tokens: &Semaphore, capacity: usize) {
    if tokens.available_permits() < capacity {
        tokens.add_permits(1);
    }
}

/// Token bucket rate limiter.
///
/// Construct one per upstream and share it (behind an `Arc`) between every
/// fetcher. The refill task lives until [`shutdown`](Self::shutdown) is
/// called or the limiter is dropped.
///
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: RwLock<Arc<TokenBucket>>,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Create a limiter allowing `requests_per_second` calls per second.
    ///
    /// The bucket starts full. A rate of zero is treated as one; rates above
    /// [`MAX_REQUESTS_PER_SECOND`] are capped.
    pub fn new(requests_per_second: u32) -> Self {
        let shutdown = CancellationToken::new();
        let rate = Self::sanitize(requests_per_second);
        let bucket = TokenBucket::start(rate, rate as usize, &shutdown);

        Self {
            bucket: RwLock::new(bucket),
            shutdown,
        }
    }

    fn sanitize(requests_per_second: u32) -> u32 {
        match requests_per_second {
            0 => {
                warn!("Rate limiter: rate of 0 requests/second is invalid, using 1");
                1
            }
            rate if rate > MAX_REQUESTS_PER_SECOND => {
                warn!(
                    "Rate limiter: rate of {} requests/second is too high, using {}",
                    rate, MAX_REQUESTS_PER_SECOND
                );
                MAX_REQUESTS_PER_SECOND
            }
            rate => rate,
        }
    }

    /// Lock the bucket for reading, recovering from poison if necessary.
    fn read_bucket(&self) -> RwLockReadGuard<'_, Arc<TokenBucket>> {
        self.bucket.read().unwrap_or_else(|poisoned| {
            warn!("Rate limiter bucket lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Lock the bucket for writing, recovering from poison if necessary.
    fn write_bucket(&self) -> RwLockWriteGuard<'_, Arc<TokenBucket>> {
        self.bucket.write().unwrap_or_else(|poisoned| {
            warn!("Rate limiter bucket lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn current(&self) -> Arc<TokenBucket> {
        Arc::clone(&self.read_bucket())
    }

    /// Wait for a token.
    ///
    /// Returns [`MarketDataError::Cancelled`] as soon as `ctx` is cancelled
    /// or its deadline passes; a cancelled wait consumes no token.
    /// Returns [`MarketDataError::Shutdown`] once the limiter is stopped.
    pub async fn acquire(&self, ctx: &RequestContext) -> Result<RatePermit> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(MarketDataError::Shutdown);
            }

            let bucket = self.current();

            tokio::select! {
                biased;
                () = ctx.cancelled() => {
                    debug!("Rate limiter: wait cancelled");
                    return Err(MarketDataError::Cancelled);
                }
                acquired = bucket.tokens.acquire() => match acquired {
                    Ok(permit) => {
                        permit.forget();
                        return Ok(RatePermit { _private: () });
                    }
                    // Bucket retired: either shut down or replaced by reconfigure.
                    Err(_) => continue,
                },
            }
        }
    }

    /// Take a token if one is available right now.
    pub fn try_acquire(&self) -> Option<RatePermit> {
        match self.current().tokens.try_acquire() {
            Ok(permit) => {
                permit.forget();
                Some(RatePermit { _private: () })
            }
            Err(TryAcquireError::NoPermits) => None,
            Err(TryAcquireError::Closed) => None,
        }
    }

    /// Tokens currently in the bucket.
    pub fn available(&self) -> usize {
        self.current().tokens.available_permits()
    }

    /// Maximum number of tokens the bucket holds.
    pub fn capacity(&self) -> usize {
        self.current().capacity
    }

    /// Time between two refill ticks.
    pub fn interval(&self) -> Duration {
        self.current().interval
    }

    /// Replace the bucket with one at the new rate.
    ///
    /// The new bucket inherits the tokens left in the old one, capped at the
    /// new capacity, so reconfiguring never grants extra tokens. Permits
    /// already handed out stay valid. Tasks waiting on the old bucket move
    /// over to the new one.
    pub fn reconfigure(&self, requests_per_second: u32) {
        if self.shutdown.is_cancelled() {
            warn!("Rate limiter: ignoring reconfigure after shutdown");
            return;
        }

        let rate = Self::sanitize(requests_per_second);
        let mut bucket = self.write_bucket();

        // Closing first freezes the count: no acquire can drain it afterwards.
        bucket.retire();
        let remaining = bucket.tokens.available_permits();
        *bucket = TokenBucket::start(rate, remaining, &self.shutdown);
        drop(bucket);

        debug!(
            "Rate limiter: reconfigured to {} requests/second",
            requests_per_second
        );
    }

    /// Stop the refill task and fail all current and future waits.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.current().retire();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
