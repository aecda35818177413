use std::path::Path;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Public read-only demo shop API, used when no endpoint is configured.
pub const DEMO_API_URL: &str = "https://readonlydemo.vendure.io/shop-api";

/// Response header carrying a freshly issued auth token.
pub const DEFAULT_AUTH_TOKEN_HEADER: &str = "vendure-auth-token";

const API_URL_ENV: &str = "VENDURE_API_URL";
const AUTH_TOKEN_HEADER_ENV: &str = "VENDURE_AUTH_TOKEN_HEADER";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for `StorefrontClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontClientConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub auth_token_header: String,
}

/// File/env shape of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawConfig {
    api_url: Option<String>,
    timeout_secs: u64,
    auth_token_header: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            auth_token_header: DEFAULT_AUTH_TOKEN_HEADER.to_owned(),
        }
    }
}

impl StorefrontClientConfig {
    /// Create configuration for an explicit shop API endpoint
    #[must_use]
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            timeout: DEFAULT_TIMEOUT,
            auth_token_header: DEFAULT_AUTH_TOKEN_HEADER.to_owned(),
        }
    }

    /// Configuration pointing at the public demo shop API
    #[must_use]
    pub fn demo() -> Self {
        Self::new(DEMO_API_URL)
    }

    /// Set a custom timeout for the whole round trip
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the response header name that carries newly issued auth tokens
    #[must_use]
    pub fn with_auth_token_header(mut self, header: impl Into<String>) -> Self {
        self.auth_token_header = header.into();
        self
    }

    /// Create configuration from environment variables
    ///
    /// Reads:
    /// - `VENDURE_API_URL`: shop API endpoint (default: the public demo API)
    /// - `VENDURE_AUTH_TOKEN_HEADER`: auth token response header (default: `vendure-auth-token`)
    ///
    /// # Errors
    /// Returns `ClientError::Config` if `VENDURE_API_URL` is set but empty.
    pub fn from_env() -> Result<Self, ClientError> {
        let api_url = std::env::var(API_URL_ENV).ok();
        let mut config = Self::with_fallback(api_url)?;
        if let Ok(header) = std::env::var(AUTH_TOKEN_HEADER_ENV) {
            config.auth_token_header = header;
        }
        Ok(config)
    }

    /// Load layered configuration: defaults, then the optional YAML file,
    /// then `STOREFRONT_*` environment variables.
    ///
    /// # Errors
    /// Returns `ClientError::Config` when a source is malformed or the
    /// resulting endpoint is empty.
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        Self::load_with(path, None)
    }

    /// Same as [`StorefrontClientConfig::load`], with `api_url` layered on
    /// top of every other source when given.
    ///
    /// # Errors
    /// Returns `ClientError::Config` when a source is malformed or the
    /// resulting endpoint is empty.
    pub fn load_with(path: Option<&Path>, api_url: Option<String>) -> Result<Self, ClientError> {
        let mut figment = Figment::from(Serialized::defaults(RawConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("STOREFRONT_"));
        if let Some(api_url) = api_url {
            figment = figment.merge(Serialized::default("api_url", api_url));
        }
        let raw: RawConfig = figment.extract()?;

        let mut config = Self::with_fallback(raw.api_url)?;
        config.timeout = Duration::from_secs(raw.timeout_secs);
        config.auth_token_header = raw.auth_token_header;
        Ok(config)
    }

    fn with_fallback(api_url: Option<String>) -> Result<Self, ClientError> {
        match api_url {
            Some(url) if url.trim().is_empty() => {
                Err(ClientError::Config("shop API url is empty".into()))
            }
            Some(url) => Ok(Self::new(url)),
            None => {
                tracing::warn!(
                    api_url = DEMO_API_URL,
                    "no shop API url configured, falling back to the demo endpoint"
                );
                Ok(Self::demo())
            }
        }
    }
}
