#![allow(dead_code)]

use std::sync::Once;

use bearer_token_manager::token::{
    JwtExpiryExtractor, RawResponse, TokenFetcher, TokenHttpClient, TokenManager, TokenRequest,
};
use bearer_token_manager::{Error, ManualClock, TokenManagerConfig};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Method;

pub const TOKEN_FIELD: &str = "access_token";
pub const TOKEN_PATH: &str = "/identity/token";
pub const API_KEY: &str = "test-api-key";

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// HS256 token carrying `iat` and `exp`.
pub fn jwt(iat: i64, exp: i64) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: &'static str,
        iat: i64,
        exp: i64,
    }
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: "service-id",
            iat,
            exp,
        },
        &EncodingKey::from_secret(b"issuer-secret"),
    )
    .expect("sign test token")
}

pub fn token_body(token: &str) -> serde_json::Value {
    serde_json::json!({
        "access_token": token,
        "refresh_token": "not-used",
        "token_type": "Bearer",
        "expires_in": 3600
    })
}

pub fn config(server_uri: &str) -> TokenManagerConfig {
    TokenManagerConfig::new(format!("{server_uri}{TOKEN_PATH}"), TOKEN_FIELD)
}

/// Fetcher exchanging an API key for a token with a form POST.
pub struct ApiKeyFetcher {
    api_key: String,
}

impl ApiKeyFetcher {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl TokenFetcher for ApiKeyFetcher {
    async fn fetch_token(&self, config: &TokenManagerConfig) -> Result<RawResponse, Error> {
        let request = TokenRequest::new(Method::POST, &config.url)
            .header("Accept", "application/json")
            .form_param("grant_type", "urn:ibm:params:oauth:grant-type:apikey")
            .form_param("apikey", &self.api_key)
            .basic_auth("bx", "bx");
        TokenHttpClient::from_config(config)?.request(request).await
    }
}

pub type JwtManager = TokenManager<ApiKeyFetcher, JwtExpiryExtractor, ManualClock>;

pub fn jwt_manager(server_uri: &str, clock: &ManualClock) -> JwtManager {
    TokenManager::new(
        config(server_uri),
        ApiKeyFetcher::new(API_KEY),
        JwtExpiryExtractor::trusting_issuer(TOKEN_FIELD),
    )
    .with_clock(clock.clone())
}
