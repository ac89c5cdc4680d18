//! `POST /webhook`: the provider's signed call-event notifications.
//!
//! Any authenticated envelope is answered 200, including accept failures
//! and event types needing no action.  Verification problems are 400.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};

use crate::runtime::AcceptOutcome;
use crate::state::AppState;

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match state.acceptor.handle(&headers, &body).await {
        Ok(outcome) => {
            if let AcceptOutcome::AcceptFailed { call_id } = &outcome {
                tracing::warn!(call_id = %call_id, "webhook acknowledged, call not monitored");
            }
            StatusCode::OK.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "webhook rejected");
            api_error(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}
