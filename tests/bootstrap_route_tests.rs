mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use common::full_query;
use common::mock_backend::{self, MockBackend, TABLE};
use serde_json::Value;
use session_gate::config::GateStrategy;
use session_gate::error::BoxError;
use session_gate::router::{GateState, gate_router};
use session_gate::{HookOptions, InitCallback, StoreSource};
use tower::ServiceExt;

fn remote_options() -> HookOptions {
    HookOptions::new(
        reqwest::Client::new(),
        StoreSource::Remote {
            table: TABLE.to_string(),
        },
    )
}

fn app() -> axum::Router {
    gate_router(GateState::new(remote_options(), "server-app"))
}

fn app_with(options: HookOptions, init: InitCallback) -> axum::Router {
    gate_router(GateState::new(options, "server-app").with_init(init))
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn healthz_is_ok() {
    let resp = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_parameters_return_400() {
    let (status, body) = get_json(app(), "/bootstrap?project_url=http%3A%2F%2Flocalhost&public_key=k").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_PARAMETERS");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("access_token"));
    assert!(message.contains("refresh_token"));
}

#[tokio::test]
async fn bootstrap_initializes_default_app() {
    let mock = MockBackend::default();
    let base = mock_backend::start(mock.clone()).await;
    let token = mock.issue_token(3600);

    let uri = format!("/bootstrap?{}", full_query(&base, &token));
    let (status, body) = get_json(app(), &uri).await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["initialized"], true);
    assert_eq!(body["loading"], false);
    assert_eq!(body["user_id"], mock_backend::USER_ID);
    assert!(body["error"].is_null());
    assert_eq!(mock.with(|m| m.installations.get("server-app").copied()), Some(true));
}

#[tokio::test]
async fn bootstrap_honours_app_id_parameter() {
    let mock = MockBackend::default();
    let base = mock_backend::start(mock.clone()).await;
    let token = mock.issue_token(3600);

    let uri = format!("/bootstrap?{}&app_id=custom", full_query(&base, &token));
    let (status, _) = get_json(app(), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(mock.with(|m| m.installations.get("custom").copied()), Some(true));
    assert!(!mock.with(|m| m.installations.contains_key("server-app")));
}

#[tokio::test]
async fn rejected_token_returns_401() {
    let mock = MockBackend::default();
    let base = mock_backend::start(mock.clone()).await;
    let forged = mock_backend::make_jwt("nobody", chrono::Utc::now().timestamp() + 600);

    let uri = format!("/bootstrap?{}", full_query(&base, &forged));
    let (status, body) = get_json(app(), &uri).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn lookup_failure_returns_502() {
    let mock = MockBackend::default();
    mock.with(|m| m.fail_lookup = true);
    let base = mock_backend::start(mock.clone()).await;
    let token = mock.issue_token(600);

    let uri = format!("/bootstrap?{}", full_query(&base, &token));
    let (status, body) = get_json(app(), &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "BAD_GATEWAY");
}

#[tokio::test]
async fn unparseable_project_url_returns_400() {
    let uri = format!("/bootstrap?{}", full_query("not a url", "a.b.c"));
    let (status, body) = get_json(app(), &uri).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PROJECT_URL");
}

#[tokio::test]
async fn callback_failure_returns_500() {
    let mock = MockBackend::default();
    let base = mock_backend::start(mock.clone()).await;
    let token = mock.issue_token(600);
    let failing = InitCallback::new(|_| async { Err::<(), BoxError>("seed failed".into()) });

    let uri = format!("/bootstrap?{}", full_query(&base, &token));
    let (status, body) = get_json(app_with(remote_options(), failing), &uri).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INITIALIZATION_FAILED");
    assert!(mock.with(|m| m.installations.is_empty()));
}

#[tokio::test]
async fn stuck_claim_returns_500_with_its_own_code() {
    let mock = MockBackend::default();
    mock.with(|m| m.fail_update = true);
    let base = mock_backend::start(mock.clone()).await;
    let token = mock.issue_token(600);
    let failing = InitCallback::new(|_| async { Err::<(), BoxError>("seed failed".into()) });

    let uri = format!("/bootstrap?{}", full_query(&base, &token));
    let options = remote_options().with_strategy(GateStrategy::Claim);
    let (status, body) = get_json(app_with(options, failing), &uri).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "INITIALIZATION_STUCK");
    assert_eq!(mock.with(|m| m.installations.get("server-app").copied()), Some(true));
}
