pub mod health;
pub mod webhooks;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router.  Both routes are public: the webhook carries its
/// own signature and the health probe exposes nothing sensitive.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(webhooks::receive))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
}
