//! Slack incoming-webhook delivery

use reqwest::Client;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use crate::error::DeliveryFailure;
use crate::message::Message;

/// Which webhook a message is headed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    General,
    Failure,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::General => f.write_str("general"),
            Channel::Failure => f.write_str("failure"),
        }
    }
}

/// A single Slack webhook endpoint. The URL is a secret and is never logged.
#[derive(Clone)]
pub struct SlackWebhook {
    channel: Channel,
    url: String,
    client: Client,
}

impl fmt::Debug for SlackWebhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackWebhook")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl SlackWebhook {
    pub fn new(channel: Channel, url: impl Into<String>, client: Client) -> Self {
        Self {
            channel,
            url: url.into(),
            client,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Post the message once. Transport errors and non-2xx responses are
    /// reported as failures; nothing is retried.
    pub async fn deliver(&self, message: &Message) -> Result<(), DeliveryFailure> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| self.failure(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if status.is_success() {
            debug!("Slack notification sent to {} channel", self.channel);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            "Slack webhook for {} channel failed: {} - {}",
            self.channel, status, body
        );
        Err(self.failure(format!("webhook responded {} - {}", status, body)))
    }

    fn failure(&self, reason: String) -> DeliveryFailure {
        DeliveryFailure {
            channel: self.channel,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Block;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Start a local stand-in for Slack answering every POST with `status`.
    async fn fake_slack(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    (status, "ok")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), received)
    }

    fn message() -> Message {
        Message::new(
            "Build failed: Build for main".to_string(),
            "#ea4335",
            vec![Block::context(["*Type:* Build"])],
        )
    }

    #[tokio::test]
    async fn test_deliver_posts_message_json() {
        let (url, received) = fake_slack(StatusCode::OK).await;
        let webhook = SlackWebhook::new(Channel::General, url, Client::new());

        webhook.deliver(&message()).await.unwrap();

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["text"], "Build failed: Build for main");
        assert_eq!(bodies[0]["attachments"][0]["color"], "#ea4335");
    }

    #[tokio::test]
    async fn test_deliver_reports_non_success_status() {
        let (url, _received) = fake_slack(StatusCode::FORBIDDEN).await;
        let webhook = SlackWebhook::new(Channel::Failure, url, Client::new());

        let failure = webhook.deliver(&message()).await.unwrap_err();
        assert_eq!(failure.channel, Channel::Failure);
        assert!(failure.reason.contains("403"));
    }

    #[tokio::test]
    async fn test_deliver_reports_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let webhook = SlackWebhook::new(
            Channel::General,
            format!("http://{}/hook", addr),
            Client::new(),
        );
        let failure = webhook.deliver(&message()).await.unwrap_err();
        assert!(failure.reason.starts_with("request failed"));
    }

    #[test]
    fn test_debug_hides_url() {
        let webhook = SlackWebhook::new(
            Channel::General,
            "https://hooks.slack.com/services/secret",
            Client::new(),
        );
        assert!(!format!("{:?}", webhook).contains("secret"));
    }
}
