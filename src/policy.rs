//! Decides whether a build event warrants a notification

use std::collections::HashSet;
use std::fmt;

use crate::event::{BuildEvent, BuildStatus};

pub const DEFAULT_NOTIFY_STATUSES: [BuildStatus; 5] = [
    BuildStatus::Success,
    BuildStatus::Failure,
    BuildStatus::InternalError,
    BuildStatus::Timeout,
    BuildStatus::Cancelled,
];

pub const DEFAULT_FAILURE_STATUSES: [BuildStatus; 3] = [
    BuildStatus::Failure,
    BuildStatus::InternalError,
    BuildStatus::Timeout,
];

pub const DEFAULT_IGNORE_TAG: &str = "schedule";

/// Filtering rules, built once at startup
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    pub notify_statuses: HashSet<BuildStatus>,
    pub failure_statuses: HashSet<BuildStatus>,
    pub ignore_tags: HashSet<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            notify_statuses: DEFAULT_NOTIFY_STATUSES.into_iter().collect(),
            failure_statuses: DEFAULT_FAILURE_STATUSES.into_iter().collect(),
            ignore_tags: HashSet::from([DEFAULT_IGNORE_TAG.to_string()]),
        }
    }
}

/// Why a build did not produce a notification
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    StatusNotNotified(BuildStatus),
    IgnoredTag(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::StatusNotNotified(status) => {
                write!(f, "status {} is not in the notify list", status)
            }
            SkipReason::IgnoredTag(tag) => {
                write!(f, "successful build carries ignored tag '{}'", tag)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyDecision {
    pub send: bool,
    pub send_to_failure_channel: bool,
    pub skip_reason: Option<SkipReason>,
}

impl NotifyDecision {
    fn skip(reason: SkipReason) -> Self {
        Self {
            send: false,
            send_to_failure_channel: false,
            skip_reason: Some(reason),
        }
    }
}

/// Evaluate the notification policy for a build.
///
/// Successful builds carrying any ignored tag are suppressed, while failures
/// of the same builds still go out.
pub fn should_notify(
    build: &BuildEvent,
    policy: &PolicyConfig,
    failure_channel_configured: bool,
) -> NotifyDecision {
    if !policy.notify_statuses.contains(&build.status) {
        return NotifyDecision::skip(SkipReason::StatusNotNotified(build.status.clone()));
    }

    if build.status == BuildStatus::Success {
        if let Some(tag) = build.tags.iter().find(|t| policy.ignore_tags.contains(*t)) {
            return NotifyDecision::skip(SkipReason::IgnoredTag(tag.clone()));
        }
    }

    NotifyDecision {
        send: true,
        send_to_failure_channel: failure_channel_configured
            && policy.failure_statuses.contains(&build.status),
        skip_reason: None,
    }
}
