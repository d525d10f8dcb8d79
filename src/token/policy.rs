use std::time::Duration;

use crate::errors::Error;

/// Timing rules for the single-flight fetch and the opportunistic refresh.
#[derive(Clone, Debug)]
pub struct PacingPolicy {
    /// How long a claim on the expired-token fetch stays valid, in seconds.
    pub claim_window_secs: i64,
    /// How often waiting callers re-check the cached token.
    pub poll_interval: Duration,
    /// How far `refresh_at` is pushed out when a caller takes the refresh.
    pub refresh_backoff_secs: i64,
    /// Share of the TTL left when the opportunistic refresh becomes due.
    pub refresh_fraction: f64,
}

impl PacingPolicy {
    pub fn new(
        claim_window_secs: i64,
        poll_interval: Duration,
        refresh_backoff_secs: i64,
        refresh_fraction: f64,
    ) -> Result<Self, Error> {
        if claim_window_secs <= 0 {
            return Err(Error::Config("Claim window must be > 0".into()));
        }
        if poll_interval.is_zero() {
            return Err(Error::Config("Poll interval must be > 0".into()));
        }
        if refresh_backoff_secs < 0 {
            return Err(Error::Config("Refresh backoff must not be negative".into()));
        }
        if !(refresh_fraction > 0.0 && refresh_fraction < 1.0) {
            return Err(Error::Config(format!(
                "Refresh fraction must be within (0, 1) (got {refresh_fraction})"
            )));
        }
        Ok(Self {
            claim_window_secs,
            poll_interval,
            refresh_backoff_secs,
            refresh_fraction,
        })
    }

    /// Refresh time for a token expiring at `expire_at` with the given TTL.
    ///
    /// Rounds the buffer up so the refresh never lands later than 80% of the
    /// TTL, and never lands after `expire_at`.
    pub fn refresh_at(&self, expire_at: i64, ttl: i64) -> i64 {
        let buffer = (ttl as f64 * self.refresh_fraction).ceil() as i64;
        expire_at.saturating_sub(buffer).min(expire_at)
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            claim_window_secs: 60,
            poll_interval: Duration::from_millis(500),
            refresh_backoff_secs: 60,
            refresh_fraction: 0.2,
        }
    }
}
