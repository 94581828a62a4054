use std::future::Future;

use crate::error::GateError;
use crate::types::installation::{Claim, InstallationRecord, Lookup};

/// Durable storage for installation records.
pub trait InstallationStore: Send + Sync {
    fn find(
        &self,
        app_id: &str,
    ) -> impl Future<Output = Result<Lookup<InstallationRecord>, GateError>> + Send;

    /// Upsert the record for `app_id` with `initialized = true`.
    fn mark_initialized(&self, app_id: &str) -> impl Future<Output = Result<(), GateError>> + Send;

    /// Atomically move the record from absent or not-initialized to
    /// initialized. Exactly one concurrent caller observes [`Claim::Won`].
    fn claim(&self, app_id: &str) -> impl Future<Output = Result<Claim, GateError>> + Send;

    /// Undo a won claim after the callback failed. The row is kept with
    /// `initialized = false`.
    fn release(&self, app_id: &str) -> impl Future<Output = Result<(), GateError>> + Send;
}
