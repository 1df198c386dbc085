//! Asynchronous client core for the QDS REST API.
//!
//! # Overview
//! `QdsClient` turns a logical API call (path segments, optional pagination,
//! optional entity) into an HTTP request against `{endpoint}/{version}`,
//! sends it through an `HttpEngine` and decodes the JSON reply into whatever
//! shape the caller asks for.
//!
//! # Design
//! - Request building (`prepare_request`) is pure and returns a plain
//!   `HttpRequest`, so it can be checked without a network.
//! - The engine is the only seam; `ReqwestEngine` is the default.
//! - The only mutable state is the closed flag, flipped once by `close`.
//!
//! ```no_run
//! use qds_core::{ClientEntity, ForPage, HttpMethod, QdsClient, QdsConfiguration};
//!
//! # async fn run() -> qds_core::Result<()> {
//! let config = QdsConfiguration::new("https://api.qubole.com/api", "my-token")?;
//! let client = QdsClient::new(config)?;
//!
//! let commands: serde_json::Value = client
//!     .invoke_request(Some(ForPage::new(1, 10)), None, &["commands"])
//!     .await?;
//!
//! let entity = ClientEntity::with_body(&serde_json::json!({"query": "show tables;"}), HttpMethod::Post)?;
//! let submitted: serde_json::Value = client.invoke_request(None, Some(&entity), &["commands"]).await?;
//!
//! client.close();
//! # let _ = (commands, submitted);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use client::{parse_response, QdsClient, AUTH_TOKEN_HEADER};
pub use config::{EngineSettings, QdsConfiguration, QdsConfigurationBuilder};
pub use error::{Error, Result};
pub use http::{HttpEngine, HttpMethod, HttpRequest, HttpResponse, ReqwestEngine};
pub use types::{ClientEntity, ForPage};
