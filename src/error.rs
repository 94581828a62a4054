use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Error type returned by user-supplied initialization callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, ThisError)]
pub enum GateError {
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed access token: {0}")]
    MalformedToken(String),

    #[error("no session assigned to client")]
    NoSession,

    #[error("auth server error ({status}): {message}")]
    Auth { status: StatusCode, message: String },

    #[error("data API error ({status}): {message}")]
    Rest {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("initialization callback failed: {0}")]
    Callback(BoxError),

    /// The callback failed and the won claim could not be undone, so the
    /// record still says initialized.
    #[error("initialization callback failed: {callback}; releasing the claim also failed: {release}")]
    ReleaseFailed {
        callback: BoxError,
        release: Box<GateError>,
    },

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl GateError {
    fn status_and_body(&self) -> (StatusCode, ApiErrorBody) {
        match self {
            GateError::MissingParameters(missing) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "MISSING_PARAMETERS".to_string(),
                    message: format!("Missing required parameters: {}", missing.join(", ")),
                },
            ),
            GateError::UrlParse(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "INVALID_PROJECT_URL".to_string(),
                    message: "Project URL is not a valid URL.".to_string(),
                },
            ),
            GateError::MalformedToken(_) | GateError::NoSession | GateError::Auth { .. } => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Session could not be established.".to_string(),
                },
            ),
            GateError::Reqwest(_) | GateError::Json(_) | GateError::Rest { .. } => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Backend service request failed.".to_string(),
                },
            ),
            GateError::Callback(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INITIALIZATION_FAILED".to_string(),
                    message: "Initialization callback failed.".to_string(),
                },
            ),
            GateError::ReleaseFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INITIALIZATION_STUCK".to_string(),
                    message: "Initialization callback failed and the installation record could not be reset.".to_string(),
                },
            ),
            GateError::DatabaseError(_) | GateError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
        }
    }
}

impl IntoResponse for &GateError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(ApiErrorResponse { error })).into_response()
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        (&self).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
