use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TokenManagerConfig;
use crate::errors::Error;
use crate::telemetry::fetch::{FetchPath, FetchTelemetry};

use super::{
    ExpiryExtractor, PacingPolicy, RawResponse, TokenFetcher, TokenRecord, TokenStateSnapshot,
};

/// Caches a bearer token and decides when to fetch a new one.
///
/// Share one instance between tasks (`Arc<TokenManager<..>>`). When the token
/// is missing or expired, exactly one caller per claim window fetches while
/// the others poll until the new token lands. Once the refresh time has
/// passed, the next caller refreshes the token directly.
///
/// The refresh path is paced only by `refresh_at`, not by the claim, so a
/// refresh and a paced fetch may overlap. A failed refresh leaves `refresh_at`
/// pushed out, so the next refresh attempt waits for the back-off (60s by
/// default) while the current token stays in use until it expires.
pub struct TokenManager<F, E, C = SystemClock> {
    config: TokenManagerConfig,
    fetcher: F,
    extractor: E,
    clock: C,
    policy: PacingPolicy,
    state: Mutex<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    record: Option<TokenRecord>,
    refresh_at: i64,
    claimed_at: i64,
}

impl TokenState {
    fn install(&mut self, record: TokenRecord) {
        self.refresh_at = record.refresh_at();
        self.record = Some(record);
    }

    /// Clears the claim only if it is still the one stamped at `claimed_at`.
    fn release(&mut self, claimed_at: i64) {
        if self.claimed_at == claimed_at {
            self.claimed_at = 0;
        }
    }
}

fn lock(state: &Mutex<TokenState>) -> MutexGuard<'_, TokenState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ownership of the paced fetch. Dropping it without completing releases the
/// claim, which covers errors and cancelled callers alike.
struct Claim<'a> {
    state: &'a Mutex<TokenState>,
    claimed_at: i64,
    released: bool,
}

impl Claim<'_> {
    fn complete(mut self, record: TokenRecord) {
        let mut state = lock(self.state);
        state.install(record);
        state.release(self.claimed_at);
        self.released = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.released {
            lock(self.state).release(self.claimed_at);
        }
    }
}

impl<F, E> TokenManager<F, E, SystemClock>
where
    F: TokenFetcher,
    E: ExpiryExtractor,
{
    pub fn new(config: TokenManagerConfig, fetcher: F, extractor: E) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            clock: SystemClock,
            policy: PacingPolicy::default(),
            state: Mutex::new(TokenState::default()),
        }
    }
}

impl<F, E, C> TokenManager<F, E, C>
where
    F: TokenFetcher,
    E: ExpiryExtractor,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> TokenManager<F, E, C2> {
        TokenManager {
            config: self.config,
            fetcher: self.fetcher,
            extractor: self.extractor,
            clock,
            policy: self.policy,
            state: self.state,
        }
    }

    pub fn with_policy(mut self, policy: PacingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &TokenManagerConfig {
        &self.config
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// Takes effect from the next fetch.
    pub fn set_disable_tls_verification(&mut self, disable: bool) {
        self.config.disable_tls_verification = disable;
    }

    pub fn snapshot(&self) -> TokenStateSnapshot {
        let state = lock(&self.state);
        TokenStateSnapshot {
            expire_at: state.record.as_ref().map_or(0, TokenRecord::expire_at),
            refresh_at: state.refresh_at,
            claimed_at: state.claimed_at,
        }
    }

    /// The last successful token response, if any.
    pub fn cached_response(&self) -> Option<RawResponse> {
        lock(&self.state).record.as_ref().map(|r| r.raw().clone())
    }

    /// Returns a token that is valid at the time of the call, fetching one
    /// first if needed.
    pub async fn get_token(&self) -> Result<String, Error> {
        if self.is_expired() {
            self.paced_request_token().await?;
        }

        if self.needs_refresh() {
            self.refresh_token().await?;
        }

        lock(&self.state)
            .record
            .as_ref()
            .map(|record| record.token().to_string())
            .ok_or(Error::NoToken)
    }

    /// True when no token has been fetched yet or the cached one has expired.
    pub fn is_expired(&self) -> bool {
        let now = self.clock.now();
        lock(&self.state)
            .record
            .as_ref()
            .is_none_or(|record| record.is_expired(now))
    }

    /// Checks whether the refresh time has passed and, if so, pushes it out by
    /// the refresh back-off before returning true.
    ///
    /// Not a pure query: the caller that gets `true` owns the refresh, and
    /// every other caller sees `false` until the back-off has passed.
    pub fn needs_refresh(&self) -> bool {
        let now = self.clock.now();
        let mut state = lock(&self.state);
        if state.refresh_at < now {
            state.refresh_at = now.saturating_add(self.policy.refresh_backoff_secs);
            true
        } else {
            false
        }
    }

    /// Replaces the cached record with one built from `raw`, e.g. a response
    /// obtained outside the manager. Leaves any claim untouched.
    pub fn save_token_info(&self, raw: RawResponse) -> Result<(), Error> {
        let record = self.build_record(raw)?;
        lock(&self.state).install(record);
        Ok(())
    }

    async fn paced_request_token(&self) -> Result<(), Error> {
        loop {
            let now = self.clock.now();
            let claim = {
                let mut state = lock(&self.state);
                // Freshness and the claim are decided under the same lock, so
                // a record installed since the caller saw expiry is honoured.
                if state
                    .record
                    .as_ref()
                    .is_some_and(|record| !record.is_expired(now))
                {
                    return Ok(());
                }
                let active =
                    state.claimed_at > now.saturating_sub(self.policy.claim_window_secs);
                if active {
                    None
                } else {
                    state.claimed_at = now;
                    Some(Claim {
                        state: &self.state,
                        claimed_at: now,
                        released: false,
                    })
                }
            };

            if let Some(claim) = claim {
                let record = self.fetch_record(FetchPath::Paced).await?;
                claim.complete(record);
                return Ok(());
            }

            debug!(
                poll_ms = self.policy.poll_interval.as_millis() as u64,
                "token.fetch.contended"
            );
            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    async fn refresh_token(&self) -> Result<(), Error> {
        match self.fetch_record(FetchPath::Refresh).await {
            Ok(record) => {
                lock(&self.state).install(record);
                Ok(())
            }
            Err(err) => {
                let refresh_at = self.snapshot().refresh_at;
                warn!(
                    refresh_at,
                    "token refresh failed; keeping current token until the next refresh window"
                );
                Err(err)
            }
        }
    }

    async fn fetch_record(&self, path: FetchPath) -> Result<TokenRecord, Error> {
        let telemetry = FetchTelemetry::new(path);
        telemetry.emit_start(self.clock.now());
        let result = self
            .fetcher
            .fetch_token(&self.config)
            .await
            .and_then(|raw| self.build_record(raw));
        match &result {
            Ok(record) => telemetry.emit_success(record.expire_at(), record.refresh_at()),
            Err(err) => telemetry.emit_failure(err),
        }
        result
    }

    fn build_record(&self, raw: RawResponse) -> Result<TokenRecord, Error> {
        let (expire_at, ttl) = self.extractor.extract_expiry_and_ttl(&raw)?;
        let refresh_at = self.policy.refresh_at(expire_at, ttl);
        TokenRecord::new(raw, &self.config.token_field_name, expire_at, refresh_at)
    }
}
