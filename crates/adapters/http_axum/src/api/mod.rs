//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod automations;
pub mod status;

use axum::Router;
use axum::routing::get;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::get))
        .route("/automations", get(automations::list))
        .route("/automations/{id}", get(automations::get))
}
