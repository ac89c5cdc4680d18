use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /health`: liveness probe, no side effects.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let agents: Vec<&str> = state.catalog.agent_ids().collect();
    Json(serde_json::json!({
        "status": "healthy",
        "service": format!("{} Webhook Server", state.catalog.centre_name()),
        "agents": agents,
        "active_calls": state.supervisor.active_count(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
