use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{PARAM_ACCESS_TOKEN, PARAM_PROJECT_URL, PARAM_PUBLIC_KEY, PARAM_REFRESH_TOKEN};
use crate::error::GateError;

/// The four session values exactly as they arrived on the query string.
///
/// Nothing here is validated; see [`SessionParams::credentials`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    pub project_url: Option<String>,
    pub public_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionParams")
            .field("project_url", &self.project_url)
            .field("public_key", &self.public_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SessionParams {
    /// Collect the session parameters from a raw query string (no leading `?`).
    /// Unknown keys are ignored; for repeated keys the last value wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match k.as_ref() {
                PARAM_PROJECT_URL => &mut params.project_url,
                PARAM_PUBLIC_KEY => &mut params.public_key,
                PARAM_ACCESS_TOKEN => &mut params.access_token,
                PARAM_REFRESH_TOKEN => &mut params.refresh_token,
                _ => continue,
            };
            *slot = Some(v.into_owned());
        }
        params
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }

    /// All-or-nothing validation: either every parameter is present and
    /// non-empty, or the error lists each one that is not.
    pub fn credentials(&self) -> Result<SessionCredentials, GateError> {
        let fields = [
            (PARAM_PROJECT_URL, &self.project_url),
            (PARAM_PUBLIC_KEY, &self.public_key),
            (PARAM_ACCESS_TOKEN, &self.access_token),
            (PARAM_REFRESH_TOKEN, &self.refresh_token),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().is_none_or(str::is_empty))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(GateError::MissingParameters(missing));
        }

        Ok(SessionCredentials {
            project_url: self.project_url.clone().unwrap_or_default(),
            public_key: self.public_key.clone().unwrap_or_default(),
            access_token: self.access_token.clone().unwrap_or_default(),
            refresh_token: self.refresh_token.clone().unwrap_or_default(),
        })
    }
}

/// Validated session credentials. Every field is non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub project_url: String,
    pub public_key: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("project_url", &self.project_url)
            .finish_non_exhaustive()
    }
}

/// User record returned by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Session currently assigned to a client handle.
#[derive(Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}
