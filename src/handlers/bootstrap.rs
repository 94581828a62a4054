use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::middleware::SessionQuery;
use crate::router::GateState;
use crate::service::bootstrap::{Activation, ActivationRequest};
use crate::service::gate::InitCallback;

/// GET /bootstrap -> one activation from the query's session parameters.
pub async fn bootstrap_handler(
    State(state): State<GateState>,
    SessionQuery { params, app_id }: SessionQuery,
) -> Response {
    let app_id = app_id.unwrap_or_else(|| state.default_app_id.to_string());
    let request = ActivationRequest::new(params, app_id.clone()).with_init(state.init.clone());

    let hook_state = Activation::new(request, &state.options)
        .run()
        .await
        .into_state(1);

    if let Some(err) = hook_state.error() {
        return (&**err).into_response();
    }
    info!(app_id = %app_id, "bootstrap served");
    Json(hook_state.snapshot()).into_response()
}

/// GET /healthz
pub async fn healthz_handler() -> &'static str {
    "ok"
}

/// Callback used by the HTTP front: nothing to seed beyond the record itself.
pub fn default_init() -> InitCallback {
    InitCallback::new(|client| async move {
        info!(project = %client.project_url(), "first activation for this app");
        Ok(())
    })
}
