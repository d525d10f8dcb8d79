use serde::Serialize;
use serde_json::Value;

use crate::errors::Error;

/// JSON object returned by the token service.
pub type RawResponse = serde_json::Map<String, Value>;

/// One successful fetch: the response plus the timestamps derived from it.
///
/// Never mutated after construction; the manager swaps whole records.
#[derive(Clone, Debug)]
pub struct TokenRecord {
    raw: RawResponse,
    token: String,
    expire_at: i64,
    refresh_at: i64,
}

impl TokenRecord {
    pub(crate) fn new(
        raw: RawResponse,
        token_field_name: &str,
        expire_at: i64,
        refresh_at: i64,
    ) -> Result<Self, Error> {
        let token = token_field(&raw, token_field_name)?.to_string();
        Ok(Self {
            raw,
            token,
            expire_at,
            refresh_at: refresh_at.min(expire_at),
        })
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// The bearer token found at the configured field name.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expire_at(&self) -> i64 {
        self.expire_at
    }

    pub fn refresh_at(&self) -> i64 {
        self.refresh_at
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expire_at < now
    }
}

/// Serializable view of the manager's timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenStateSnapshot {
    /// `0` until the first successful fetch.
    pub expire_at: i64,
    pub refresh_at: i64,
    /// `0` when no paced fetch is in flight.
    pub claimed_at: i64,
}

pub(crate) fn token_field<'a>(raw: &'a RawResponse, field: &str) -> Result<&'a str, Error> {
    match raw.get(field) {
        Some(Value::String(token)) => Ok(token),
        Some(other) => Err(Error::Decode(format!(
            "field '{field}' is not a string (got {other})"
        ))),
        None => Err(Error::Decode(format!(
            "token response has no '{field}' field"
        ))),
    }
}
