//! Request dispatcher for the QDS REST API.
//!
//! # Design
//! `QdsClient` owns the configuration, an `HttpEngine` and a closed flag, and
//! nothing else. Every call goes through two steps: `prepare_request` turns
//! the logical call (path segments, pagination, entity) into a plain
//! `HttpRequest` without any I/O, then `invoke_request` hands it to the
//! engine and decodes the reply. Calls share no mutable state, so any number
//! may be in flight at once.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use tracing::field::Empty;
use tracing::{debug, instrument, trace, Span};
use url::Url;

use crate::config::QdsConfiguration;
use crate::error::{Error, Result};
use crate::http::{HttpEngine, HttpMethod, HttpRequest, HttpResponse, ReqwestEngine};
use crate::types::{ClientEntity, ForPage};

pub const AUTH_TOKEN_HEADER: &str = "X-AUTH-TOKEN";
const APPLICATION_JSON: &str = "application/json";

/// Asynchronous dispatcher for the QDS API.
///
/// Cheap to share behind an `Arc`. Resource-specific helpers call
/// `invoke_request` with their own path segments and entities.
#[derive(Debug)]
pub struct QdsClient<E = ReqwestEngine> {
    configuration: QdsConfiguration,
    base_url: Url,
    engine: E,
    closed: AtomicBool,
}

impl QdsClient<ReqwestEngine> {
    /// Validate `configuration` and build the default reqwest engine from it.
    pub fn new(configuration: QdsConfiguration) -> Result<Self> {
        configuration.validate()?;
        let engine = configuration.new_engine()?;
        Self::with_engine(configuration, engine)
    }
}

impl<E: HttpEngine> QdsClient<E> {
    /// Dispatch through `engine` instead of the one `configuration` would build.
    pub fn with_engine(configuration: QdsConfiguration, engine: E) -> Result<Self> {
        configuration.validate()?;

        let mut base_url = configuration.api_endpoint().clone();
        push_segments(&mut base_url, [configuration.api_version()])?;

        Ok(Self {
            configuration,
            base_url,
            engine,
            closed: AtomicBool::new(false),
        })
    }

    pub fn configuration(&self) -> &QdsConfiguration {
        &self.configuration
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// `{endpoint}/{version}`, the root every request path is appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request for a call without sending it.
    ///
    /// Path segments are appended in order; a segment containing `/` is split
    /// and empty pieces are dropped. Pagination goes on the query string
    /// first, followed by the entity's parameters in insertion order. Without
    /// an entity the request is a `GET`.
    pub fn prepare_request(
        &self,
        page: Option<ForPage>,
        entity: Option<&ClientEntity>,
        paths: &[&str],
    ) -> Result<HttpRequest> {
        let mut url = self.base_url.clone();
        push_segments(&mut url, paths.iter().copied())?;

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(page) = page {
            query.push(("page", page.page.to_string()));
            query.push(("per_page", page.per_page.to_string()));
        }
        if let Some(entity) = entity {
            query.extend(
                entity
                    .query_params()
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.clone())),
            );
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut headers = vec![("Accept".to_string(), APPLICATION_JSON.to_string())];
        if let Some(token) = self.configuration.api_token() {
            headers.push((AUTH_TOKEN_HEADER.to_string(), token.to_string()));
        }

        let body = match entity.and_then(ClientEntity::body) {
            Some(body) => {
                headers.push(("Content-Type".to_string(), APPLICATION_JSON.to_string()));
                Some(serde_json::to_string(body).map_err(Error::Serialization)?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: entity.map_or(HttpMethod::Get, ClientEntity::method),
            url: url.into(),
            headers,
            body,
        })
    }

    /// Send a call and decode the JSON reply into `T`.
    ///
    /// `T` may be any deserializable shape: a single resource, a `Vec` of
    /// them, a generic envelope or a raw `serde_json::Value`. Transport
    /// failures, non-2xx statuses and undecodable bodies all come back as
    /// `Err`; nothing is retried.
    #[instrument(skip_all, fields(method = Empty, url = Empty, status = Empty))]
    pub async fn invoke_request<T: DeserializeOwned>(
        &self,
        page: Option<ForPage>,
        entity: Option<&ClientEntity>,
        paths: &[&str],
    ) -> Result<T> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let request = self.prepare_request(page, entity, paths)?;

        let span = Span::current();
        span.record("method", request.method.as_str());
        span.record("url", request.url.as_str());
        debug!("dispatching request");

        let response = self.engine.execute(request).await?;
        span.record("status", response.status);
        parse_response(response)
    }

    /// Release the engine. Only the first call has any effect, even when
    /// several threads race to close.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("closing QDS client");
            self.engine.close();
        } else {
            trace!("QDS client already closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Decode a reply the way the engine's default handling does: 2xx bodies are
/// JSON (an empty body reads as `null`), anything else is an error.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    if !(200..300).contains(&response.status) {
        return Err(Error::Status {
            status: response.status,
            body: response.body,
        });
    }
    let body = match response.body.trim() {
        "" => "null",
        body => body,
    };
    serde_json::from_str(body).map_err(Error::Deserialization)
}

/// Append `paths` to the URL path. Characters outside the path set are
/// percent-encoded; `%XX` sequences already present are kept as they are.
fn push_segments<'a>(url: &mut Url, paths: impl IntoIterator<Item = &'a str>) -> Result<()> {
    if url.cannot_be_a_base() {
        return Err(Error::Configuration("endpoint cannot be a base URL".to_string()));
    }
    let mut path = url.path().trim_end_matches('/').to_string();
    for segment in paths.into_iter().flat_map(|p| p.split('/')).filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(segment);
    }
    url.set_path(&path);
    Ok(())
}
