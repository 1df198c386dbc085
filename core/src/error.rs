//! Error types for the QDS client.
//!
//! # Design
//! Configuration problems are reported eagerly, when a `QdsClient` or
//! `QdsConfiguration` is built. Everything that happens once a request is in
//! flight (transport, status, decode) is returned from the awaited future and
//! never retried or reinterpreted.

use thiserror::Error;

/// Errors returned by the QDS client.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected before any network activity.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The API endpoint is not a parseable URL.
    #[error("invalid endpoint URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The HTTP engine failed to deliver the request or read the reply.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request entity could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A request was issued after the client was closed.
    #[error("client is closed")]
    Closed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
