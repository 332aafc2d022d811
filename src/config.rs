//! Environment driven configuration

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{NotifierError, Result};
use crate::event::BuildStatus;
use crate::policy::PolicyConfig;

pub const WEBHOOK_URL_VAR: &str = "SLACK_WEBHOOK_URL";
pub const FAILURE_WEBHOOK_URL_VAR: &str = "SLACK_WEBHOOK_URL_FAILURE";
pub const NOTIFY_STATUSES_VAR: &str = "SLACK_NOTIFY_STATUSES";
pub const FAILURE_STATUSES_VAR: &str = "SLACK_FAILURE_STATUSES";
pub const IGNORE_TAGS_VAR: &str = "SLACK_IGNORE_TAGS";

const DEFAULT_PORT: &str = "8080";

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub webhook_url: String,
    pub failure_webhook_url: Option<String>,
    pub policy: PolicyConfig,
    pub bind_address: String,
    pub log_dir: Option<PathBuf>,
}

impl NotifierConfig {
    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let webhook_url = non_empty(WEBHOOK_URL_VAR).ok_or_else(|| {
            NotifierError::ConfigError(format!("{} must be set", WEBHOOK_URL_VAR))
        })?;

        let defaults = PolicyConfig::default();
        let notify_statuses = non_empty(NOTIFY_STATUSES_VAR)
            .map(|v| parse_statuses(&v))
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.notify_statuses);
        let failure_statuses = non_empty(FAILURE_STATUSES_VAR)
            .map(|v| parse_statuses(&v))
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.failure_statuses);
        let ignore_tags = lookup(IGNORE_TAGS_VAR)
            .map(|v| parse_list(&v).map(String::from).collect())
            .unwrap_or(defaults.ignore_tags);

        let bind_address = non_empty("BIND_ADDRESS").unwrap_or_else(|| {
            let port = non_empty("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("0.0.0.0:{}", port)
        });

        Ok(Self {
            webhook_url,
            failure_webhook_url: non_empty(FAILURE_WEBHOOK_URL_VAR),
            policy: PolicyConfig {
                notify_statuses,
                failure_statuses,
                ignore_tags,
            },
            bind_address,
            log_dir: non_empty("LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Split a comma separated value, dropping blanks
fn parse_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_statuses(value: &str) -> HashSet<BuildStatus> {
    parse_list(value)
        .map(|s| BuildStatus::from(s.to_ascii_uppercase()))
        .collect()
}
