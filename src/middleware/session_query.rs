use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::config::PARAM_APP_ID;
use crate::types::session::SessionParams;

/// Session parameters and the optional app id taken from the request query.
///
/// Never rejects: missing parameters are reported by the activation itself so
/// the HTTP front and the hook surface the same error.
#[derive(Debug, Clone)]
pub struct SessionQuery {
    pub params: SessionParams,
    pub app_id: Option<String>,
}

impl SessionQuery {
    pub fn parse(query: Option<&str>) -> Self {
        let query = query.unwrap_or_default();
        let app_id = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(k, v)| k == PARAM_APP_ID && !v.is_empty())
            .map(|(_, v)| v.into_owned())
            .last();
        Self {
            params: SessionParams::from_query(query),
            app_id,
        }
    }
}

impl<S> FromRequestParts<S> for SessionQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::parse(parts.uri.query()))
    }
}
