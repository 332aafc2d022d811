//! Decode, filter, render and deliver a single build event

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::config::NotifierConfig;
use crate::decode::decode;
use crate::delivery::{Channel, SlackWebhook};
use crate::error::{NotifierError, Result};
use crate::event::BuildEvent;
use crate::format::Formatter;
use crate::message::Message;
use crate::policy::{NotifyDecision, PolicyConfig, SkipReason, should_notify};

/// Result of handling one event that did not error
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped {
        build_id: String,
        reason: SkipReason,
    },
    Delivered {
        build_id: String,
        failure_channel: bool,
    },
}

/// What would happen to an event, without sending anything
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub build_id: String,
    pub send: bool,
    pub send_to_failure_channel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub message: Message,
}

pub struct Notifier {
    policy: PolicyConfig,
    formatter: Formatter,
    general: SlackWebhook,
    failure: Option<SlackWebhook>,
}

impl Notifier {
    pub fn new(config: &NotifierConfig) -> Self {
        let client = Client::new();
        Self {
            policy: config.policy.clone(),
            formatter: Formatter::default(),
            general: SlackWebhook::new(Channel::General, &config.webhook_url, client.clone()),
            failure: config
                .failure_webhook_url
                .as_ref()
                .map(|url| SlackWebhook::new(Channel::Failure, url, client.clone())),
        }
    }

    pub fn has_failure_channel(&self) -> bool {
        self.failure.is_some()
    }

    pub fn evaluate(&self, build: &BuildEvent) -> NotifyDecision {
        should_notify(build, &self.policy, self.has_failure_channel())
    }

    /// Handle a base64 encoded build event end to end.
    pub async fn handle(&self, raw_data: &str) -> Result<Outcome> {
        let build = decode(raw_data)?;
        let decision = self.evaluate(&build);

        if !decision.send {
            let reason = decision
                .skip_reason
                .unwrap_or(SkipReason::StatusNotNotified(build.status.clone()));
            info!("Skipping notification for build {}: {}", build.id, reason);
            return Ok(Outcome::Skipped {
                build_id: build.id,
                reason,
            });
        }

        let message = self.formatter.render(&build);
        info!(
            "Notifying for build {} ({}), failure channel: {}",
            build.id, build.status, decision.send_to_failure_channel
        );
        self.dispatch(&message, decision.send_to_failure_channel)
            .await?;

        Ok(Outcome::Delivered {
            build_id: build.id,
            failure_channel: decision.send_to_failure_channel,
        })
    }

    /// Send to the general channel and, when asked, the failure channel.
    /// Both calls are attempted regardless of the other's result.
    pub async fn dispatch(&self, message: &Message, to_failure_channel: bool) -> Result<()> {
        let failure_target = self.failure.as_ref().filter(|_| to_failure_channel);

        let (general, failure) = tokio::join!(self.general.deliver(message), async {
            match failure_target {
                Some(webhook) => webhook.deliver(message).await,
                None => Ok(()),
            }
        });

        let failures: Vec<_> = [general, failure]
            .into_iter()
            .filter_map(|r| r.err())
            .collect();
        if failures.is_empty() {
            return Ok(());
        }

        for failure in &failures {
            error!("Delivery to {} channel failed: {}", failure.channel, failure.reason);
        }
        Err(NotifierError::Delivery(failures))
    }

    /// Decode and render an event without delivering it.
    pub fn preview(&self, raw_data: &str) -> Result<Preview> {
        let build = decode(raw_data)?;
        let decision = self.evaluate(&build);
        let message = self.formatter.render(&build);
        Ok(Preview {
            build_id: build.id,
            send: decision.send,
            send_to_failure_channel: decision.send_to_failure_channel,
            skip_reason: decision.skip_reason.map(|r| r.to_string()),
            message,
        })
    }
}
