use serde_json::json;
use tracing::debug;

use super::client::BackendClient;
use super::rest::OnConflict;
use crate::error::GateError;
use crate::service::installation_store::InstallationStore;
use crate::types::installation::{Claim, InstallationRecord, Lookup};

const KEY_COLUMN: &str = "app_id";
/// Columns read back from the table; any others may have arbitrary types.
const COLUMNS: &str = "app_id,initialized";

/// Installation records kept in a table of the hosted backend.
#[derive(Debug, Clone)]
pub struct RemoteInstallations {
    client: BackendClient,
    table: String,
}

impl RemoteInstallations {
    pub fn new(client: BackendClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl InstallationStore for RemoteInstallations {
    async fn find(&self, app_id: &str) -> Result<Lookup<InstallationRecord>, GateError> {
        self.client
            .select_one(&self.table, COLUMNS, KEY_COLUMN, app_id)
            .await
    }

    async fn mark_initialized(&self, app_id: &str) -> Result<(), GateError> {
        let _: Vec<InstallationRecord> = self
            .client
            .insert(
                &self.table,
                COLUMNS,
                KEY_COLUMN,
                OnConflict::Merge,
                &InstallationRecord::initialized(app_id),
            )
            .await?;
        Ok(())
    }

    async fn claim(&self, app_id: &str) -> Result<Claim, GateError> {
        // Insert when absent; an existing row makes this a no-op returning [].
        let inserted: Vec<InstallationRecord> = self
            .client
            .insert(
                &self.table,
                COLUMNS,
                KEY_COLUMN,
                OnConflict::Ignore,
                &InstallationRecord::initialized(app_id),
            )
            .await?;
        if !inserted.is_empty() {
            return Ok(Claim::Won);
        }

        // Row exists: flip it only if nobody has yet.
        let flipped: Vec<InstallationRecord> = self
            .client
            .update(
                &self.table,
                COLUMNS,
                &[(KEY_COLUMN, app_id), ("initialized", "false")],
                &json!({ "initialized": true }),
            )
            .await?;
        debug!(app_id, won = !flipped.is_empty(), "remote claim resolved");
        Ok(if flipped.is_empty() {
            Claim::AlreadyInitialized
        } else {
            Claim::Won
        })
    }

    async fn release(&self, app_id: &str) -> Result<(), GateError> {
        let _: Vec<InstallationRecord> = self
            .client
            .update(
                &self.table,
                COLUMNS,
                &[(KEY_COLUMN, app_id)],
                &json!({ "initialized": false }),
            )
            .await?;
        Ok(())
    }
}
