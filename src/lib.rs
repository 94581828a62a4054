pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use backend::BackendClient;
pub use error::GateError;
pub use service::bootstrap::{ActivationRequest, HookOptions, StoreSource};
pub use service::gate::InitCallback;
pub use service::session_hook::{SessionHookHandle, spawn as spawn_session_hook};
pub use types::hook::{HookState, Phase};
pub use types::session::SessionParams;
