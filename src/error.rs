use std::fmt;
use std::io;

use crate::delivery::Channel;

/// Custom error type for cloud_build_notifier operations
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Could not decode build event: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid push envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Delivery failed: {}", DeliveryFailures(.0))]
    Delivery(Vec<DeliveryFailure>),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Reasons a raw event payload could not be turned into a build event
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not a valid build event: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single failed webhook call
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryFailure {
    pub channel: Channel,
    pub reason: String,
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} channel: {}", self.channel, self.reason)
    }
}

struct DeliveryFailures<'a>(&'a [DeliveryFailure]);

impl fmt::Display for DeliveryFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Helper type for Results that use NotifierError
pub type Result<T> = std::result::Result<T, NotifierError>;
