use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Which branch of `get_token` issued the fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchPath {
    /// Single-flight fetch for an expired or missing token.
    Paced,
    /// Opportunistic fetch once the refresh time has passed.
    Refresh,
}

#[derive(Clone, Debug)]
pub struct FetchTelemetry {
    attempt_id: Uuid,
    path: FetchPath,
}

impl FetchTelemetry {
    pub fn new(path: FetchPath) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            path,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn path(&self) -> FetchPath {
        self.path
    }

    pub fn emit_start(&self, now: i64) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            path = ?self.path,
            now,
            "token.fetch.start"
        );
    }

    pub fn emit_success(&self, expire_at: i64, refresh_at: i64) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            path = ?self.path,
            expire_at,
            refresh_at,
            "token.fetch.success"
        );
    }

    pub fn emit_failure(&self, error: &Error) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            path = ?self.path,
            error = %error,
            "token.fetch.failure"
        );
    }
}
