//! Build event structures as published by Cloud Build

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Placeholder shown wherever a value is unknown
pub const NOT_AVAILABLE: &str = "n/a";

/// Lifecycle status of a build
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    Unknown(String),
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Cancelled => "CANCELLED",
            BuildStatus::Unknown(raw) => raw,
        }
    }

    /// Human readable one-liner used in the message summary
    pub fn description(&self) -> &'static str {
        match self {
            BuildStatus::Queued => "New build queued",
            BuildStatus::Working => "New build in progress",
            BuildStatus::Success => "Build successfully completed",
            BuildStatus::Failure => "Build failed",
            BuildStatus::InternalError => "Internal error encountered during build",
            BuildStatus::Timeout => "Build timed out",
            BuildStatus::Cancelled => "Build cancelled",
            BuildStatus::Unknown(_) => "Unknown build status",
        }
    }

    /// Attachment colour for the status
    pub fn color(&self) -> &'static str {
        match self {
            BuildStatus::Queued | BuildStatus::Cancelled => "#fbbc05",
            BuildStatus::Working | BuildStatus::Success => "#34a853",
            BuildStatus::Failure | BuildStatus::InternalError | BuildStatus::Timeout => "#ea4335",
            BuildStatus::Unknown(_) => "#444444",
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "QUEUED" => BuildStatus::Queued,
            "WORKING" => BuildStatus::Working,
            "SUCCESS" => BuildStatus::Success,
            "FAILURE" => BuildStatus::Failure,
            "INTERNAL_ERROR" => BuildStatus::InternalError,
            "TIMEOUT" => BuildStatus::Timeout,
            "CANCELLED" => BuildStatus::Cancelled,
            _ => BuildStatus::Unknown(value.to_string()),
        }
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        BuildStatus::from(value.as_str())
    }
}

impl From<BuildStatus> for String {
    fn from(status: BuildStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository the build was triggered from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSource {
    pub project_id: Option<String>,
    pub repo_name: Option<String>,
    pub branch_name: Option<String>,
    pub tag_name: Option<String>,
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub repo_source: Option<RepoSource>,
}

/// Exact revision Cloud Build resolved the source to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRepoSource {
    pub project_id: Option<String>,
    pub repo_name: Option<String>,
    pub commit_sha: Option<String>,
    pub tag_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceProvenance {
    pub resolved_repo_source: Option<ResolvedRepoSource>,
}

/// A build lifecycle event, decoded once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEvent {
    pub id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    pub status: BuildStatus,
    #[serde(default)]
    pub log_url: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub finish_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub substitutions: HashMap<String, String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub source_provenance: Option<SourceProvenance>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl BuildEvent {
    fn repo_source(&self) -> Option<&RepoSource> {
        self.source.as_ref().and_then(|s| s.repo_source.as_ref())
    }

    fn resolved_repo_source(&self) -> Option<&ResolvedRepoSource> {
        self.source_provenance
            .as_ref()
            .and_then(|p| p.resolved_repo_source.as_ref())
    }

    fn substitution(&self, key: &str) -> Option<&str> {
        self.substitutions.get(key).map(String::as_str)
    }

    /// Project owning the source repository
    pub fn source_project_id(&self) -> Option<&str> {
        self.repo_source().and_then(|r| r.project_id.as_deref())
    }

    pub fn repo_name(&self) -> Option<&str> {
        self.repo_source()
            .and_then(|r| r.repo_name.as_deref())
            .or_else(|| self.substitution("REPO_NAME"))
    }

    pub fn branch_name(&self) -> Option<&str> {
        self.repo_source()
            .and_then(|r| r.branch_name.as_deref())
            .or_else(|| self.substitution("BRANCH_NAME"))
    }

    pub fn commit_sha(&self) -> Option<&str> {
        self.resolved_repo_source()
            .and_then(|r| r.commit_sha.as_deref())
            .or_else(|| self.substitution("COMMIT_SHA"))
            .or_else(|| self.substitution("REVISION_ID"))
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.resolved_repo_source()
            .and_then(|r| r.tag_name.as_deref())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
