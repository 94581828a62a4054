use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::client::{API_KEY_HEADER, BackendClient};
use crate::error::GateError;
use crate::types::session::{AuthSession, AuthUser};

/// Stateless auth API endpoints.
pub(super) struct AuthEndpoints;

impl AuthEndpoints {
    /// Validate an access token by fetching the user it belongs to.
    pub(super) async fn fetch_user(
        client: &BackendClient,
        access_token: &str,
    ) -> Result<AuthUser, GateError> {
        let resp = client
            .http()
            .get(client.endpoint("auth/v1/user")?)
            .header(API_KEY_HEADER, client.public_key())
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(auth_error(resp).await);
        }
        let user: AuthUser = resp.json().await?;
        info!(user_id = %user.id, "access token validated");
        Ok(user)
    }

    /// Exchange a refresh token for a fresh session.
    pub(super) async fn refresh_session(
        client: &BackendClient,
        refresh_token: &str,
    ) -> Result<AuthSession, GateError> {
        let mut url = client.endpoint("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let resp = client
            .http()
            .post(url)
            .header(API_KEY_HEADER, client.public_key())
            .header(ACCEPT, "application/json")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(auth_error(resp).await);
        }
        let token: TokenResponse = resp.json().await?;
        info!(user_id = %token.user.id, "session refreshed");
        Ok(token.into_session(Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// The auth API has used several error shapes over time.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

async fn auth_error(resp: reqwest::Response) -> GateError {
    let status = resp.status();
    let body: AuthErrorBody = resp.json().await.unwrap_or_default();
    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    GateError::Auth { status, message }
}
