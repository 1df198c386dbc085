//! HTTP transport types and the engine seam behind `QdsClient`.
//!
//! # Design
//! Requests and responses are described as plain data. `QdsClient` builds an
//! `HttpRequest` without touching the network and hands it to an
//! `HttpEngine`, which performs the round-trip and reports back an
//! `HttpResponse`. Status interpretation and JSON decoding happen in the
//! client, never in the engine.
//!
//! `ReqwestEngine` is the engine used in production. Tests swap in engines
//! that record requests instead of sending them.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use reqwest::header::HeaderValue;
use tracing::debug;

use crate::client::AUTH_TOKEN_HEADER;
use crate::config::{token_header_value, EngineSettings};
use crate::error::{Error, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `QdsClient::prepare_request`. `url` is absolute and already
/// carries the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The asynchronous transport that carries requests for `QdsClient`.
pub trait HttpEngine: Send + Sync {
    /// Send `request` and resolve to whatever the server answered, whatever
    /// its status.
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;

    /// Release pooled resources. Called at most once by `QdsClient::close`.
    fn close(&self);
}

/// `HttpEngine` backed by a pooled `reqwest::Client`.
#[derive(Debug)]
pub struct ReqwestEngine {
    client: Mutex<Option<reqwest::Client>>,
}

impl ReqwestEngine {
    pub fn new(settings: &EngineSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self {
            client: Mutex::new(Some(client)),
        })
    }

    fn client(&self) -> Result<reqwest::Client> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Closed)
    }
}

impl HttpEngine for ReqwestEngine {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        let client = self.client();
        async move {
            let client = client?;
            let mut builder = client.request(request.method.into(), request.url.as_str());
            for (name, value) in &request.headers {
                let value = if name.eq_ignore_ascii_case(AUTH_TOKEN_HEADER) {
                    token_header_value(value)?
                } else {
                    HeaderValue::from_bytes(value.as_bytes()).map_err(|_| {
                        Error::Configuration(format!("invalid value for header {name}"))
                    })?
                };
                builder = builder.header(name.as_str(), value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
                .collect();
            let body = response.text().await?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn close(&self) {
        // In-flight requests hold their own clone and finish normally.
        if self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            debug!("released reqwest connection pool");
        }
    }
}
