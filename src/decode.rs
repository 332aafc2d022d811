//! Pub/Sub push envelope and build event decoding

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::DecodeError;
use crate::event::BuildEvent;

/// Body of a Pub/Sub push request
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64 encoded build event JSON
    pub data: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default, alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(default, alias = "publish_time")]
    pub publish_time: Option<String>,
}

/// Decode a base64 payload into a build event.
pub fn decode(raw: &str) -> Result<BuildEvent, DecodeError> {
    debug!("Raw build event payload: {}", raw);
    let bytes = STANDARD.decode(raw.trim())?;
    let text = String::from_utf8(bytes)?;
    debug!("Decoded build event: {}", text);
    let build = serde_json::from_str(&text)?;
    Ok(build)
}
