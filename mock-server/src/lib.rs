use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_PREFIX: &str = "/api/v1.2";
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub id: u64,
    pub label: Vec<String>,
    pub state: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Command {
    pub id: u64,
    pub query: String,
    pub command_type: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct NewCommand {
    pub query: String,
    #[serde(default = "default_command_type")]
    pub command_type: String,
}

fn default_command_type() -> String {
    "HiveCommand".to_string()
}

#[derive(Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn first_page() -> usize {
    1
}

fn default_per_page() -> usize {
    10
}

/// Everything the server saw of a request, returned by the echo fallback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EchoedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub auth_token: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct Store {
    clusters: BTreeMap<u64, Cluster>,
    commands: BTreeMap<u64, Command>,
    next_command_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

/// Server with three seeded clusters and no authentication.
pub fn app() -> Router {
    router(None)
}

/// Same as `app`, but every request must carry `X-AUTH-TOKEN: token`.
pub fn app_with_token(token: impl Into<String>) -> Router {
    router(Some(token.into()))
}

fn router(token: Option<String>) -> Router {
    let db: Db = Arc::new(RwLock::new(seeded_store()));
    let api = Router::new()
        .route("/clusters", get(list_clusters))
        .route("/clusters/{id}", get(get_cluster))
        .route("/commands", post(create_command))
        .route("/commands/{id}", get(get_command).put(cancel_command))
        .with_state(db);

    let app = Router::new().nest(API_PREFIX, api).fallback(echo);
    match token {
        Some(token) => app.layer(middleware::from_fn(move |req: Request, next: Next| {
            let token = token.clone();
            async move { require_token(&token, req, next).await }
        })),
        None => app,
    }
}

fn seeded_store() -> Store {
    let mut store = Store {
        next_command_id: 1,
        ..Store::default()
    };
    for (id, label) in [(1, "default"), (2, "etl"), (3, "adhoc")] {
        store.clusters.insert(
            id,
            Cluster {
                id,
                label: vec![label.to_string()],
                state: "DOWN".to_string(),
            },
        );
    }
    store
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(
    listener: TcpListener,
    token: impl Into<String>,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

async fn require_token(token: &str, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(token) {
        tracing::debug!(path = %req.uri().path(), "rejecting request without a valid token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid token"})),
        )
            .into_response();
    }
    next.run(req).await
}

async fn list_clusters(
    State(db): State<Db>,
    Query(pagination): Query<Pagination>,
) -> Json<Vec<Cluster>> {
    let store = db.read().await;
    let skip = pagination.page.saturating_sub(1) * pagination.per_page;
    Json(
        store
            .clusters
            .values()
            .skip(skip)
            .take(pagination.per_page)
            .cloned()
            .collect(),
    )
}

async fn get_cluster(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Cluster>, StatusCode> {
    let store = db.read().await;
    store.clusters.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn create_command(
    State(db): State<Db>,
    Json(input): Json<NewCommand>,
) -> (StatusCode, Json<Command>) {
    let mut store = db.write().await;
    let command = Command {
        id: store.next_command_id,
        query: input.query,
        command_type: input.command_type,
        status: "waiting".to_string(),
    };
    store.next_command_id += 1;
    store.commands.insert(command.id, command.clone());
    (StatusCode::CREATED, Json(command))
}

async fn get_command(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Command>, StatusCode> {
    let store = db.read().await;
    store.commands.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn cancel_command(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut store = db.write().await;
    let command = store.commands.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    command.status = "cancelled".to_string();
    Ok(StatusCode::NO_CONTENT)
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<EchoedRequest>, StatusCode> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_str(&body).map_err(|_| StatusCode::BAD_REQUEST)?)
    };
    Ok(Json(EchoedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        auth_token: header(AUTH_TOKEN_HEADER),
        accept: header("accept"),
        content_type: header("content-type"),
        body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_has_three_clusters() {
        let store = seeded_store();
        assert_eq!(store.clusters.len(), 3);
        assert_eq!(store.clusters[&2].label, vec!["etl".to_string()]);
        assert!(store.commands.is_empty());
        assert_eq!(store.next_command_id, 1);
    }

    #[test]
    fn new_command_defaults_type() {
        let input: NewCommand = serde_json::from_str(r#"{"query":"show tables;"}"#).unwrap();
        assert_eq!(input.command_type, "HiveCommand");
    }

    #[test]
    fn new_command_rejects_missing_query() {
        let result: Result<NewCommand, _> = serde_json::from_str(r#"{"command_type":"PrestoCommand"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!((p.page, p.per_page), (1, 10));
    }
}
