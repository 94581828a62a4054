use crate::types::installation::InstallationRecord;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct DbInstallation {
    pub app_id: String,
    pub initialized: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<DbInstallation> for InstallationRecord {
    fn from(d: DbInstallation) -> Self {
        InstallationRecord {
            app_id: d.app_id,
            initialized: d.initialized,
            updated_at: Some(d.updated_at),
        }
    }
}
