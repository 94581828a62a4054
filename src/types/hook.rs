use std::sync::Arc;

use serde::Serialize;

use crate::backend::BackendClient;
use crate::error::GateError;
use crate::types::session::{AuthSession, AuthUser};

/// An authenticated client and the session assigned to it.
#[derive(Debug, Clone)]
pub struct Connected {
    pub client: BackendClient,
    pub session: AuthSession,
}

impl Connected {
    pub fn user(&self) -> &AuthUser {
        &self.session.user
    }
}

/// Where an activation currently stands.
#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready(Connected),
    Failed {
        /// Present when the session was established before the failure.
        connected: Option<Connected>,
        error: Arc<GateError>,
    },
}

/// State published by a session hook. `generation` increases with every
/// activation whose identifying inputs changed.
#[derive(Debug, Clone, Default)]
pub struct HookState {
    pub generation: u64,
    pub phase: Phase,
}

impl HookState {
    pub fn loading(generation: u64) -> Self {
        Self {
            generation,
            phase: Phase::Loading,
        }
    }

    pub fn connected(&self) -> Option<&Connected> {
        match &self.phase {
            Phase::Ready(connected) => Some(connected),
            Phase::Failed { connected, .. } => connected.as_ref(),
            Phase::Idle | Phase::Loading => None,
        }
    }

    pub fn client(&self) -> Option<&BackendClient> {
        self.connected().map(|c| &c.client)
    }

    pub fn error(&self) -> Option<&Arc<GateError>> {
        match &self.phase {
            Phase::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    /// True once the activation for `generation` (or a later one) finished.
    pub fn is_settled_for(&self, generation: u64) -> bool {
        self.generation >= generation && matches!(self.phase, Phase::Ready(_) | Phase::Failed { .. })
    }

    pub fn snapshot(&self) -> HookSnapshot {
        HookSnapshot {
            generation: self.generation,
            loading: self.is_loading(),
            initialized: self.is_initialized(),
            user_id: self.connected().map(|c| c.user().id.clone()),
            project_url: self.client().map(|c| c.project_url().to_string()),
            error: self.error().map(|e| e.to_string()),
        }
    }
}

/// Serializable view of [`HookState`] for the HTTP front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookSnapshot {
    pub generation: u64,
    pub loading: bool,
    pub initialized: bool,
    pub user_id: Option<String>,
    pub project_url: Option<String>,
    pub error: Option<String>,
}
