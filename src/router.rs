use std::sync::Arc;

use axum::{Router, routing::get};

use crate::handlers::bootstrap::{bootstrap_handler, default_init, healthz_handler};
use crate::service::bootstrap::HookOptions;
use crate::service::gate::InitCallback;

#[derive(Clone)]
pub struct GateState {
    pub options: HookOptions,
    pub default_app_id: Arc<str>,
    pub init: InitCallback,
}

impl GateState {
    pub fn new(options: HookOptions, default_app_id: impl Into<Arc<str>>) -> Self {
        Self {
            options,
            default_app_id: default_app_id.into(),
            init: default_init(),
        }
    }

    pub fn with_init(mut self, init: InitCallback) -> Self {
        self.init = init;
        self
    }
}

pub fn gate_router(state: GateState) -> Router {
    Router::new()
        .route("/bootstrap", get(bootstrap_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}
