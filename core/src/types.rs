//! Per-call request descriptors handed to `QdsClient::invoke_request`.
//!
//! # Design
//! Resource facades build a `ClientEntity` (and optionally a `ForPage`) for
//! each call and drop it once the request has been prepared. Bodies are
//! encoded to a `serde_json::Value` up front, so an entity is a plain value
//! with no borrowed payload. Query parameters are kept as an ordered list
//! because the order they were added is the order they go on the wire.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::http::HttpMethod;

/// Pagination parameters, sent as `page` and `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForPage {
    pub page: u32,
    pub per_page: u32,
}

impl ForPage {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }
}

/// Method, optional JSON body and optional query parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEntity {
    method: HttpMethod,
    body: Option<serde_json::Value>,
    query_params: Vec<(String, String)>,
}

impl ClientEntity {
    /// An entity with no body and no query parameters.
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            body: None,
            query_params: Vec::new(),
        }
    }

    /// An entity carrying `body`, encoded as JSON.
    pub fn with_body<B: Serialize + ?Sized>(body: &B, method: HttpMethod) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(Error::Serialization)?;
        Ok(Self {
            method,
            body: Some(body),
            query_params: Vec::new(),
        })
    }

    /// An entity carrying only query parameters, kept in iteration order.
    pub fn with_query<I, K, V>(params: I, method: HttpMethod) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method,
            body: None,
            query_params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Append a query parameter after the existing ones.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }
}
