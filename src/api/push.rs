//! Pub/Sub push handler for Cloud Build events

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State as AxumState},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::SharedState;
use crate::decode::PushEnvelope;
use crate::error::NotifierError;
use crate::notifier::Outcome;

/// Handles a Pub/Sub push request.
///
/// 200 means delivered, 204 means filtered out by policy. Malformed input
/// answers 400 and failed deliveries 502 so the subscription can redeliver.
pub async fn handle_push(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let dry_run = params.get("dry_run").map(|v| v == "true").unwrap_or(false)
        || headers.get("X-Dry-Run").is_some();

    state.counters.record_received();

    let envelope: PushEnvelope = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Could not parse push envelope: {:?}", e);
            state.counters.record_rejected();
            return error_response(&NotifierError::InvalidEnvelope(e.to_string()));
        }
    };

    let span = info_span!(
        "push",
        invocation_id = %Uuid::now_v7(),
        message_id = envelope.message.message_id.as_deref().unwrap_or("-"),
    );

    async move {
        debug!(
            "Push from subscription {:?} with attributes {:?}",
            envelope.subscription, envelope.message.attributes
        );

        if dry_run {
            return match state.notifier.preview(&envelope.message.data) {
                Ok(preview) => {
                    info!("[DRY_RUN] Rendered build {}", preview.build_id);
                    Json(preview).into_response()
                }
                Err(e) => {
                    warn!("[DRY_RUN] {}", e);
                    state.counters.record_rejected();
                    error_response(&e)
                }
            };
        }

        match state.notifier.handle(&envelope.message.data).await {
            Ok(Outcome::Delivered {
                build_id,
                failure_channel,
            }) => {
                info!(
                    "Build {} notified (failure channel: {})",
                    build_id, failure_channel
                );
                state.counters.record_delivered();
                StatusCode::OK.into_response()
            }
            Ok(Outcome::Skipped { build_id, reason }) => {
                info!("Build {} filtered by policy: {}", build_id, reason);
                state.counters.record_skipped();
                StatusCode::NO_CONTENT.into_response()
            }
            Err(e @ NotifierError::Decode(_)) => {
                error!("Rejected push message: {}", e);
                state.counters.record_rejected();
                error_response(&e)
            }
            Err(e) => {
                error!("Notification failed: {}", e);
                state.counters.record_failed();
                error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

fn error_response(err: &NotifierError) -> Response {
    let status = match err {
        NotifierError::Decode(_) | NotifierError::InvalidEnvelope(_) => StatusCode::BAD_REQUEST,
        NotifierError::Delivery(_) => StatusCode::BAD_GATEWAY,
        NotifierError::ConfigError(_) | NotifierError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": err.to_string()}))).into_response()
}
