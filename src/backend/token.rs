use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::GateError;

/// Claims read from an access token payload. The signature is not checked;
/// the auth API does that when the token is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// A token without `exp` never counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

pub fn decode_claims(token: &str) -> Result<AccessClaims, GateError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(GateError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| GateError::MalformedToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&decoded)
        .map_err(|e| GateError::MalformedToken(format!("payload is not JSON: {e}")))
}
