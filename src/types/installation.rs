use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per application identifier marking whether one-time setup ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub app_id: String,
    pub initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InstallationRecord {
    pub fn initialized(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            initialized: true,
            updated_at: None,
        }
    }
}

/// Result of a single-row lookup. "No rows" is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }
}

/// Result of an atomic claim on an installation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller flipped the record and must run the callback.
    Won,
    /// Someone already holds the record as initialized.
    AlreadyInitialized,
}
