use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::config::GateStrategy;
use crate::error::{BoxError, GateError};
use crate::service::installation_store::InstallationStore;
use crate::types::installation::{Claim, Lookup};

type CallbackFn = dyn Fn(BackendClient) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;

/// Caller-supplied routine executed at most once per application identifier.
#[derive(Clone)]
pub struct InitCallback(Arc<CallbackFn>);

impl InitCallback {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(BackendClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let f: Arc<CallbackFn> = Arc::new(move |client| f(client).boxed());
        Self(f)
    }

    pub fn noop() -> Self {
        Self::new(|_| async { Ok(()) })
    }

    pub async fn call(&self, client: BackendClient) -> Result<(), BoxError> {
        (self.0)(client).await
    }
}

impl Default for InitCallback {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for InitCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InitCallback(..)")
    }
}

/// What the gate did for one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The record was already initialized; the callback did not run.
    AlreadyInitialized,
    /// The callback ran and the record now says initialized.
    Initialized,
}

/// Run `init` at most once for `app_id`, as recorded in `store`.
pub async fn run_gate<S: InstallationStore>(
    store: &S,
    app_id: &str,
    client: &BackendClient,
    init: &InitCallback,
    strategy: GateStrategy,
) -> Result<GateOutcome, GateError> {
    match strategy {
        GateStrategy::CheckThenUpsert => check_then_upsert(store, app_id, client, init).await,
        GateStrategy::Claim => claim_then_run(store, app_id, client, init).await,
    }
}

async fn check_then_upsert<S: InstallationStore>(
    store: &S,
    app_id: &str,
    client: &BackendClient,
    init: &InitCallback,
) -> Result<GateOutcome, GateError> {
    if let Lookup::Found(record) = store.find(app_id).await?
        && record.initialized
    {
        debug!(app_id, "already initialized; skipping callback");
        return Ok(GateOutcome::AlreadyInitialized);
    }

    info!(app_id, "running initialization callback");
    init.call(client.clone())
        .await
        .map_err(GateError::Callback)?;
    store.mark_initialized(app_id).await?;
    info!(app_id, "installation marked initialized");
    Ok(GateOutcome::Initialized)
}

async fn claim_then_run<S: InstallationStore>(
    store: &S,
    app_id: &str,
    client: &BackendClient,
    init: &InitCallback,
) -> Result<GateOutcome, GateError> {
    if store.claim(app_id).await? == Claim::AlreadyInitialized {
        debug!(app_id, "claim lost; treating as initialized");
        return Ok(GateOutcome::AlreadyInitialized);
    }

    info!(app_id, "claim won; running initialization callback");
    if let Err(e) = init.call(client.clone()).await {
        return Err(match store.release(app_id).await {
            Ok(()) => GateError::Callback(e),
            Err(release_err) => {
                warn!(app_id, error = %release_err, "claim release failed; record left initialized");
                GateError::ReleaseFailed {
                    callback: e,
                    release: Box::new(release_err),
                }
            }
        });
    }
    Ok(GateOutcome::Initialized)
}
