use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_token, Cluster, Command, EchoedRequest};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- clusters ---

#[tokio::test]
async fn list_clusters_returns_seeded() {
    let resp = app().oneshot(get("/api/v1.2/clusters")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let clusters: Vec<Cluster> = body_json(resp).await;
    let ids: Vec<u64> = clusters.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn list_clusters_paginates() {
    let resp = app()
        .oneshot(get("/api/v1.2/clusters?page=2&per_page=2"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let clusters: Vec<Cluster> = body_json(resp).await;
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].id, 3);
}

#[tokio::test]
async fn get_cluster_found() {
    let resp = app().oneshot(get("/api/v1.2/clusters/2")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cluster: Cluster = body_json(resp).await;
    assert_eq!(cluster.label, vec!["etl".to_string()]);
}

#[tokio::test]
async fn get_cluster_not_found() {
    let resp = app().oneshot(get("/api/v1.2/clusters/99")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- commands ---

#[tokio::test]
async fn create_command_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v1.2/commands", r#"{"query":"show tables;"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let command: Command = body_json(resp).await;
    assert_eq!(command.id, 1);
    assert_eq!(command.command_type, "HiveCommand");
    assert_eq!(command.status, "waiting");
}

#[tokio::test]
async fn create_command_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v1.2/commands", r#"{"not_query":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn command_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/api/v1.2/commands",
            r#"{"query":"select 1","command_type":"PrestoCommand"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Command = body_json(resp).await;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/v1.2/commands/{}", created.id))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/api/v1.2/commands/{}", created.id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Command = body_json(resp).await;
    assert_eq!(fetched.status, "cancelled");
    assert_eq!(fetched.command_type, "PrestoCommand");
}

// --- echo ---

#[tokio::test]
async fn echo_reports_request_details() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1.2/scheduler/5/actions?page=1&per_page=20&status=done")
        .header("x-auth-token", "tok123")
        .header(http::header::ACCEPT, "application/json")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"kill":true}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed: EchoedRequest = body_json(resp).await;
    assert_eq!(echoed.method, "POST");
    assert_eq!(echoed.path, "/api/v1.2/scheduler/5/actions");
    assert_eq!(
        echoed.query,
        vec![
            ("page".to_string(), "1".to_string()),
            ("per_page".to_string(), "20".to_string()),
            ("status".to_string(), "done".to_string()),
        ]
    );
    assert_eq!(echoed.auth_token.as_deref(), Some("tok123"));
    assert_eq!(echoed.accept.as_deref(), Some("application/json"));
    assert_eq!(echoed.body, Some(serde_json::json!({"kill": true})));
}

#[tokio::test]
async fn echo_without_body_or_token() {
    let resp = app().oneshot(get("/elsewhere")).await.unwrap();

    let echoed: EchoedRequest = body_json(resp).await;
    assert_eq!(echoed.method, "GET");
    assert!(echoed.query.is_empty());
    assert!(echoed.auth_token.is_none());
    assert!(echoed.body.is_none());
}

// --- auth ---

#[tokio::test]
async fn token_required_when_configured() {
    let resp = app_with_token("secret")
        .oneshot(get("/api/v1.2/clusters"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/v1.2/clusters")
        .header("x-auth-token", "secret")
        .body(String::new())
        .unwrap();
    let resp = app_with_token("secret").oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
