mod extractor;
mod fetcher;
mod manager;
mod policy;
mod record;

pub use extractor::{ExpiryExtractor, JwtExpiryExtractor, ResponseFieldExtractor, SignatureVerification};
pub use fetcher::{TokenFetcher, TokenHttpClient, TokenRequest};
pub use manager::TokenManager;
pub use policy::PacingPolicy;
pub use record::{RawResponse, TokenRecord, TokenStateSnapshot};
