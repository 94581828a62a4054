use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{BackendClient, RemoteInstallations, build_http_client};
use crate::config::{Config, GateStrategy};
use crate::db::SqliteInstallations;
use crate::error::GateError;
use crate::service::gate::{GateOutcome, InitCallback, run_gate};
use crate::types::hook::{Connected, HookState, Phase};
use crate::types::session::SessionParams;

/// Where installation records are kept.
#[derive(Debug, Clone)]
pub enum StoreSource {
    /// A table in the hosted backend, reached with the session's client.
    Remote { table: String },
    /// A local SQLite database.
    Local(SqliteInstallations),
}

/// Everything an activation needs besides its identifying inputs.
#[derive(Debug, Clone)]
pub struct HookOptions {
    pub http: reqwest::Client,
    pub store: StoreSource,
    pub strategy: GateStrategy,
}

impl HookOptions {
    pub fn new(http: reqwest::Client, store: StoreSource) -> Self {
        Self {
            http,
            store,
            strategy: GateStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: GateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Options as configured: the local store when `database_url` is set,
    /// otherwise the remote installations table.
    pub async fn from_config(cfg: &Config) -> Result<Self, GateError> {
        let http = build_http_client(cfg)?;
        let store = match cfg.database_url.as_deref() {
            Some(url) => StoreSource::Local(SqliteInstallations::connect(url).await?),
            None => StoreSource::Remote {
                table: cfg.installations_table.clone(),
            },
        };
        Ok(Self::new(http, store).with_strategy(cfg.gate_strategy))
    }
}

/// The inputs whose change triggers a new activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationKey {
    pub params: SessionParams,
    pub app_id: String,
}

#[derive(Debug, Clone)]
pub struct ActivationRequest {
    pub params: SessionParams,
    pub app_id: String,
    pub init: InitCallback,
}

impl ActivationRequest {
    pub fn new(params: SessionParams, app_id: impl Into<String>) -> Self {
        Self {
            params,
            app_id: app_id.into(),
            init: InitCallback::noop(),
        }
    }

    pub fn with_init(mut self, init: InitCallback) -> Self {
        self.init = init;
        self
    }

    pub fn key(&self) -> ActivationKey {
        ActivationKey {
            params: self.params.clone(),
            app_id: self.app_id.clone(),
        }
    }
}

/// Result of one activation. `connected` survives a gate failure.
#[derive(Debug, Clone)]
pub struct ActivationOutcome {
    pub connected: Option<Connected>,
    pub result: Result<GateOutcome, Arc<GateError>>,
}

impl ActivationOutcome {
    fn failed(connected: Option<Connected>, error: GateError) -> Self {
        Self {
            connected,
            result: Err(Arc::new(error)),
        }
    }

    /// The settled hook state this outcome produces.
    pub fn into_state(self, generation: u64) -> HookState {
        let phase = match (self.result, self.connected) {
            (Ok(_), Some(connected)) => Phase::Ready(connected),
            (Err(error), connected) => Phase::Failed { connected, error },
            (Ok(_), None) => Phase::Failed {
                connected: None,
                error: Arc::new(GateError::NoSession),
            },
        };
        HookState { generation, phase }
    }
}

/// One pass of parameter extraction, session bootstrap and initialization gate.
pub struct Activation {
    request: ActivationRequest,
    options: HookOptions,
}

impl Activation {
    pub fn new(request: ActivationRequest, options: &HookOptions) -> Self {
        Self {
            request,
            options: options.clone(),
        }
    }

    pub async fn run(self) -> ActivationOutcome {
        let app_id = self.request.app_id.as_str();

        let connected = match self.connect().await {
            Ok(c) => c,
            Err(e) => {
                warn!(app_id, error = %e, "session bootstrap failed");
                return ActivationOutcome::failed(None, e);
            }
        };

        let gate = match &self.options.store {
            StoreSource::Remote { table } => {
                let store = RemoteInstallations::new(connected.client.clone(), table.clone());
                run_gate(
                    &store,
                    app_id,
                    &connected.client,
                    &self.request.init,
                    self.options.strategy,
                )
                .await
            }
            StoreSource::Local(store) => {
                run_gate(
                    store,
                    app_id,
                    &connected.client,
                    &self.request.init,
                    self.options.strategy,
                )
                .await
            }
        };

        match gate {
            Ok(outcome) => {
                info!(app_id, ?outcome, user_id = %connected.user().id, "activation complete");
                ActivationOutcome {
                    connected: Some(connected),
                    result: Ok(outcome),
                }
            }
            Err(e) => {
                warn!(app_id, error = %e, "initialization gate failed");
                ActivationOutcome::failed(Some(connected), e)
            }
        }
    }

    async fn connect(&self) -> Result<Connected, GateError> {
        let creds = self.request.params.credentials()?;
        let client = BackendClient::new(
            self.options.http.clone(),
            &creds.project_url,
            creds.public_key.as_str(),
        )?;
        let session = client
            .set_session(&creds.access_token, &creds.refresh_token)
            .await?;
        Ok(Connected { client, session })
    }
}
