use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::RequestBuilder;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use super::endpoints::AuthEndpoints;
use super::token::decode_claims;
use crate::config::Config;
use crate::error::GateError;
use crate::types::session::AuthSession;

/// Header carrying the project's public key on every request.
pub(crate) const API_KEY_HEADER: &str = "apikey";

/// Build the shared HTTP client from configuration.
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client, GateError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs));
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

/// Handle to one backend project. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    project_url: Url,
    public_key: Arc<str>,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("project_url", &self.project_url.as_str())
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Construct an unauthenticated client for `project_url`.
    pub fn new(
        http: reqwest::Client,
        project_url: &str,
        public_key: impl Into<Arc<str>>,
    ) -> Result<Self, GateError> {
        let mut url = Url::parse(project_url)?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(GateError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        // `join` resolves against the last segment unless the path ends with '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            http,
            project_url: url,
            public_key: public_key.into(),
            session: Arc::new(RwLock::new(None)),
        })
    }

    pub fn project_url(&self) -> &Url {
        &self.project_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn public_key(&self) -> &str {
        &self.public_key
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, GateError> {
        Ok(self.project_url.join(path)?)
    }

    /// Replace the session held by this handle.
    ///
    /// An expired access token is exchanged through the refresh token; a live
    /// one is validated against the auth API before being accepted.
    pub async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<AuthSession, GateError> {
        let claims = decode_claims(access_token)?;

        let session = if claims.is_expired(Utc::now()) {
            info!(project = %self.project_url, "access token expired; refreshing session");
            AuthEndpoints::refresh_session(self, refresh_token).await?
        } else {
            let user = AuthEndpoints::fetch_user(self, access_token).await?;
            AuthSession {
                access_token: access_token.to_owned(),
                refresh_token: refresh_token.to_owned(),
                expires_at: claims.expires_at(),
                user,
            }
        };

        if let Some(sub) = claims.sub.as_deref()
            && sub != session.user.id
        {
            return Err(GateError::Auth {
                status: reqwest::StatusCode::UNAUTHORIZED,
                message: "access token subject does not match the session user".to_string(),
            });
        }

        debug!(user_id = %session.user.id, "session assigned");
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Attach the public key and the session bearer token to a request.
    pub(crate) async fn authorized(&self, rb: RequestBuilder) -> Result<RequestBuilder, GateError> {
        let guard = self.session.read().await;
        let session = guard.as_ref().ok_or(GateError::NoSession)?;
        Ok(rb
            .header(API_KEY_HEADER, self.public_key())
            .bearer_auth(&session.access_token))
    }
}
