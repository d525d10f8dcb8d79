//! Caches bearer tokens from a token service and hands them to HTTP callers.
//!
//! [`TokenManager`] fetches a token only when the cached one is missing,
//! expired, or past its refresh time, and makes concurrent callers share a
//! single fetch when the token has expired. Deployments plug in how a token is
//! fetched ([`token::TokenFetcher`]) and how its lifetime is read
//! ([`token::ExpiryExtractor`]).

pub mod clock;
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLocation, TokenManagerConfig};
pub use errors::Error;
pub use token::TokenManager;
