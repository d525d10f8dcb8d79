//! read token manager configuration from a file or the environment

use std::path::Path;
use std::time::Duration;

use crate::errors::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub enum ConfigLocation {
    File(String),
    /// Variables named `{PREFIX}_URL`, `{PREFIX}_TOKEN_FIELD_NAME`, ...
    Env(String),
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct TokenManagerConfig {
    pub url: String,
    #[serde(default)]
    pub disable_tls_verification: bool,
    pub token_field_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl TokenManagerConfig {
    pub fn new(url: impl Into<String>, token_field_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            disable_tls_verification: false,
            token_field_name: token_field_name.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn load(loc: ConfigLocation) -> Result<Self, Error> {
        match loc {
            ConfigLocation::File(path) => Self::from_file(path),
            ConfigLocation::Env(prefix) => Self::from_env(&prefix),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env(prefix: &str) -> Result<Self, Error> {
        let var = |name: &str| std::env::var(format!("{prefix}_{name}"));
        let required = |name: &str| {
            var(name).map_err(|_| Error::Config(format!("Missing {prefix}_{name} env var")))
        };

        let mut config = Self::new(required("URL")?, required("TOKEN_FIELD_NAME")?);
        if let Ok(flag) = var("DISABLE_TLS_VERIFICATION") {
            config.disable_tls_verification = flag.parse().map_err(|_| {
                Error::Config(format!(
                    "{prefix}_DISABLE_TLS_VERIFICATION must be 'true' or 'false' (got '{flag}')"
                ))
            })?;
        }
        if let Ok(secs) = var("TIMEOUT_SECS") {
            config.timeout_secs = secs.parse().map_err(|_| {
                Error::Config(format!("{prefix}_TIMEOUT_SECS must be an integer (got '{secs}')"))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_disable_tls_verification(mut self, disable: bool) -> Self {
        self.disable_tls_verification = disable;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), Error> {
        reqwest::Url::parse(&self.url).map_err(|e| {
            Error::Config(format!("Invalid token service URL '{}': {}", self.url, e))
        })?;
        if self.token_field_name.trim().is_empty() {
            return Err(Error::Config("token_field_name must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}
