//! HTTP surface: the Pub/Sub push endpoint plus health and status

pub mod push;
pub mod stats;

use axum::{Router, routing};

use crate::SharedState;

pub use push::handle_push;
pub use stats::status;

pub async fn root() -> &'static str {
    "cloud_build_notifier is running"
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root).post(handle_push))
        .route("/status", routing::get(status))
        .with_state(state)
}
