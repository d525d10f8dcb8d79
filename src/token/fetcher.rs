use std::future::Future;

use reqwest::{Client, Method};
use tracing::{debug, error};

use crate::config::TokenManagerConfig;
use crate::errors::Error;

use super::record::RawResponse;

const USER_AGENT: &str = "bearer-token-manager-rust/0.1.0";

/// One network exchange with the token service.
///
/// Each deployment implements this for its issuer's protocol.
pub trait TokenFetcher: Send + Sync {
    fn fetch_token(
        &self,
        config: &TokenManagerConfig,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

/// A single request to the token service.
#[derive(Clone, Debug)]
pub struct TokenRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Appended to the URL's query string.
    pub query: Vec<(String, String)>,
    /// Sent as `application/x-www-form-urlencoded` when present.
    pub form: Option<Vec<(String, String)>>,
    pub basic_auth: Option<(String, String)>,
}

impl TokenRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            form: None,
            basic_auth: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn form_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((user.into(), password.into()));
        self
    }

    fn form_body(&self) -> Option<String> {
        self.form.as_ref().map(|params| {
            params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        })
    }
}

/// HTTP plumbing for [`TokenFetcher`] implementations: applies the configured
/// timeout and TLS toggle, and turns non-2xx answers into [`Error::Transport`].
#[derive(Clone, Debug)]
pub struct TokenHttpClient {
    client: Client,
}

impl TokenHttpClient {
    pub fn from_config(config: &TokenManagerConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.disable_tls_verification)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn request(&self, request: TokenRequest) -> Result<RawResponse, Error> {
        let body = request.form_body();
        let TokenRequest {
            method,
            url,
            headers,
            query,
            basic_auth,
            ..
        } = request;

        let mut builder = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(
                "token request failed: method={} url='{}' status={} body='{}'",
                method, url, status, body
            );
            return Err(Error::Transport(status, body));
        }
        debug!("token request ok: method={} url='{}' status={}", method, url, status);

        match serde_json::from_str::<serde_json::Value>(&body)? {
            serde_json::Value::Object(raw) => Ok(raw),
            _ => Err(Error::Decode("token response is not a JSON object".into())),
        }
    }
}
