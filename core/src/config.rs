//! Client configuration.
//!
//! A `QdsConfiguration` is built once, validated eagerly and then held by
//! `QdsClient` for its whole lifetime. It also acts as the factory for the
//! HTTP engine through `new_engine`.

use std::time::Duration;

use reqwest::header::HeaderValue;
use url::Url;

use crate::error::{Error, Result};
use crate::http::ReqwestEngine;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.qubole.com/api";
pub const DEFAULT_API_VERSION: &str = "v1.2";

/// Settings consumed by the HTTP engine factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("qds-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QdsConfiguration {
    api_endpoint: Url,
    api_version: String,
    api_token: Option<String>,
    engine: EngineSettings,
}

impl QdsConfiguration {
    /// Configuration for `endpoint` with `token` and defaults for the rest.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Self::builder().api_endpoint(endpoint).api_token(token).build()
    }

    pub fn builder() -> QdsConfigurationBuilder {
        QdsConfigurationBuilder::default()
    }

    pub fn api_endpoint(&self) -> &Url {
        &self.api_endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn engine_settings(&self) -> &EngineSettings {
        &self.engine
    }

    /// Build the HTTP engine a `QdsClient` dispatches through.
    pub fn new_engine(&self) -> Result<ReqwestEngine> {
        ReqwestEngine::new(&self.engine)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !matches!(self.api_endpoint.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "endpoint must be an http(s) URL, got {}",
                self.api_endpoint
            )));
        }
        if self.api_endpoint.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "endpoint cannot carry path segments: {}",
                self.api_endpoint
            )));
        }
        if self.api_version.trim_matches('/').is_empty() {
            return Err(Error::Configuration("API version cannot be empty".to_string()));
        }
        if let Some(token) = &self.api_token {
            token_header_value(token)?;
        }
        Ok(())
    }
}

/// `token` as the value of the auth header, marked sensitive so it never
/// shows up in debug output. Empty tokens and non-ASCII bytes are allowed.
pub(crate) fn token_header_value(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_bytes(token.as_bytes()).map_err(|_| {
        Error::Configuration("API token is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

pub struct QdsConfigurationBuilder {
    api_endpoint: String,
    api_version: String,
    api_token: Option<String>,
    engine: EngineSettings,
}

impl Default for QdsConfigurationBuilder {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_token: None,
            engine: EngineSettings::default(),
        }
    }
}

impl QdsConfigurationBuilder {
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = endpoint.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.engine.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.engine.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.engine.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<QdsConfiguration> {
        let config = QdsConfiguration {
            api_endpoint: Url::parse(&self.api_endpoint)?,
            api_version: self.api_version,
            api_token: self.api_token,
            engine: self.engine,
        };
        config.validate()?;
        Ok(config)
    }
}
