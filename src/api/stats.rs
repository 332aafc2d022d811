//! Status endpoint

use axum::{Json, extract::State as AxumState};
use serde::Serialize;

use crate::{CounterSnapshot, SharedState};

/// Server information
#[derive(Debug, Serialize)]
pub struct ServerStats {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub failure_channel_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub server: ServerStats,
    pub events: CounterSnapshot,
}

/// GET /status - server info and event counters
pub async fn status(AxumState(state): AxumState<SharedState>) -> Json<StatusResponse> {
    let server = ServerStats {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        failure_channel_configured: state.notifier.has_failure_channel(),
    };

    Json(StatusResponse {
        server,
        events: state.counters.snapshot(),
    })
}
