//! Axum-based mock of the hosted backend: auth API plus a PostgREST-style
//! installations table. Each test starts its own instance on an ephemeral port.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use base64::Engine;
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

pub const PUBLIC_KEY: &str = "anon-key";
pub const TABLE: &str = "installations";
pub const USER_ID: &str = "user-1";
pub const REFRESH_TOKEN: &str = "refresh-1";
/// Like a `timestamp without time zone` column: no offset.
pub const UPDATED_AT: &str = "2024-05-01T12:00:00";

#[derive(Default)]
pub struct MockInner {
    /// app_id -> initialized
    pub installations: HashMap<String, bool>,
    pub valid_access_tokens: Vec<String>,
    pub fail_lookup: bool,
    pub fail_upsert: bool,
    pub fail_update: bool,
    pub user_calls: usize,
    pub refresh_calls: usize,
    pub upsert_calls: usize,
}

#[derive(Clone, Default)]
pub struct MockBackend {
    pub inner: Arc<Mutex<MockInner>>,
}

impl MockBackend {
    pub fn with<R>(&self, f: impl FnOnce(&mut MockInner) -> R) -> R {
        f(&mut self.inner.lock().expect("mock state poisoned"))
    }

    /// Issue an access token that the mock will accept.
    pub fn issue_token(&self, exp_offset_secs: i64) -> String {
        self.issue_token_for(USER_ID, exp_offset_secs)
    }

    /// Issue an accepted token whose `sub` claim is `sub`. The auth API still
    /// reports the session user as [`USER_ID`].
    pub fn issue_token_for(&self, sub: &str, exp_offset_secs: i64) -> String {
        let token = make_jwt(sub, chrono::Utc::now().timestamp() + exp_offset_secs);
        self.with(|m| m.valid_access_tokens.push(token.clone()));
        token
    }
}

pub fn make_jwt(sub: &str, exp: i64) -> String {
    let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!(
        "{}.{}.signature",
        enc.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        enc.encode(json!({"sub": sub, "exp": exp, "role": "authenticated"}).to_string())
    )
}

/// Start the mock and return its base URL.
pub async fn start(mock: MockBackend) -> String {
    let app = Router::new()
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/token", axum::routing::post(token))
        .route(
            "/rest/v1/{table}",
            get(select).post(insert).patch(update),
        )
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("mock backend addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serve");
    });
    format!("http://{addr}")
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(PUBLIC_KEY)
}

fn authorized(mock: &MockBackend, headers: &HeaderMap) -> bool {
    has_api_key(headers)
        && bearer(headers).is_some_and(|t| mock.with(|m| m.valid_access_tokens.contains(&t)))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": 401, "error_code": "bad_jwt", "msg": "invalid JWT"})),
    )
        .into_response()
}

async fn user(State(mock): State<MockBackend>, headers: HeaderMap) -> Response {
    mock.with(|m| m.user_calls += 1);
    if !authorized(&mock, &headers) {
        return unauthorized();
    }
    Json(json!({"id": USER_ID, "email": "user@example.com", "role": "authenticated"})).into_response()
}

async fn token(
    State(mock): State<MockBackend>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.with(|m| m.refresh_calls += 1);
    if !has_api_key(&headers)
        || query.get("grant_type").map(String::as_str) != Some("refresh_token")
        || body.get("refresh_token").and_then(Value::as_str) != Some(REFRESH_TOKEN)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid Refresh Token"})),
        )
            .into_response();
    }
    let access = mock.issue_token(3600);
    Json(json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-2",
        "user": {"id": USER_ID, "email": "user@example.com"}
    }))
    .into_response()
}

fn eq_filter<'a>(query: &'a HashMap<String, String>, column: &str) -> Option<&'a str> {
    query.get(column)?.strip_prefix("eq.")
}

/// A stored row, reduced to the columns named by `select` as the data API does.
fn row(query: &HashMap<String, String>, app_id: &str, initialized: bool) -> Value {
    let full = json!({"app_id": app_id, "initialized": initialized, "updated_at": UPDATED_AT});
    match query.get("select").map(String::as_str) {
        None | Some("*") => full,
        Some(columns) => Value::Object(
            columns
                .split(',')
                .filter_map(|c| full.get(c).map(|v| (c.to_string(), v.clone())))
                .collect(),
        ),
    }
}

fn pg_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"code": code, "message": message, "details": null, "hint": null})),
    )
        .into_response()
}

async fn select(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&mock, &headers) || table != TABLE {
        return unauthorized();
    }
    if mock.with(|m| m.fail_lookup) {
        return pg_error(StatusCode::INTERNAL_SERVER_ERROR, "XX000", "lookup exploded");
    }
    let Some(app_id) = eq_filter(&query, "app_id") else {
        return pg_error(StatusCode::BAD_REQUEST, "PGRST100", "missing filter");
    };
    match mock.with(|m| m.installations.get(app_id).copied()) {
        Some(initialized) => Json(row(&query, app_id, initialized)).into_response(),
        None => pg_error(
            StatusCode::NOT_ACCEPTABLE,
            "PGRST116",
            "JSON object requested, multiple (or no) rows returned",
        ),
    }
}

async fn insert(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&mock, &headers) || table != TABLE {
        return unauthorized();
    }
    if mock.with(|m| m.fail_upsert) {
        return pg_error(StatusCode::INTERNAL_SERVER_ERROR, "XX001", "upsert exploded");
    }
    let prefer = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let app_id = body["app_id"].as_str().unwrap_or_default().to_string();
    let initialized = body["initialized"].as_bool().unwrap_or(false);

    let written = mock.with(|m| {
        m.upsert_calls += 1;
        let exists = m.installations.contains_key(&app_id);
        if exists && prefer.contains("ignore-duplicates") {
            false
        } else {
            m.installations.insert(app_id.clone(), initialized);
            true
        }
    });
    let rows = if written {
        json!([row(&query, &app_id, initialized)])
    } else {
        json!([])
    };
    (StatusCode::CREATED, Json(rows)).into_response()
}

async fn update(
    State(mock): State<MockBackend>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    if !authorized(&mock, &headers) || table != TABLE {
        return unauthorized();
    }
    if mock.with(|m| m.fail_update) {
        return pg_error(StatusCode::INTERNAL_SERVER_ERROR, "XX002", "update exploded");
    }
    let Some(app_id) = eq_filter(&query, "app_id").map(str::to_string) else {
        return pg_error(StatusCode::BAD_REQUEST, "PGRST100", "missing filter");
    };
    let required = eq_filter(&query, "initialized").map(|v| v == "true");
    let new_value = patch["initialized"].as_bool().unwrap_or(false);

    let updated = mock.with(|m| match m.installations.get_mut(&app_id) {
        Some(current) if required.is_none_or(|r| r == *current) => {
            *current = new_value;
            true
        }
        _ => false,
    });
    let rows = if updated {
        json!([row(&query, &app_id, new_value)])
    } else {
        json!([])
    };
    Json(rows).into_response()
}
