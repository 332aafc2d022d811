//! Renders build events into Slack messages

use chrono::DateTime;

use crate::event::{BuildEvent, NOT_AVAILABLE};
use crate::message::{Block, Message};

/// Tag marking builds started by a scheduler rather than a source change
pub const DEFAULT_SCHEDULE_TAG: &str = "schedule";

/// Tags added by triggers themselves, never shown to users
const TRIGGER_TAG_PREFIX: &str = "trigger-";

const SOURCE_BROWSER_URL: &str = "https://source.cloud.google.com";
const SHORT_SHA_LEN: usize = 7;

/// Render a build with the default schedule tag.
pub fn render(build: &BuildEvent) -> Message {
    Formatter::default().render(build)
}

#[derive(Debug, Clone)]
pub struct Formatter {
    schedule_tag: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEDULE_TAG)
    }
}

impl Formatter {
    pub fn new(schedule_tag: impl Into<String>) -> Self {
        Self {
            schedule_tag: schedule_tag.into(),
        }
    }

    fn is_scheduled(&self, build: &BuildEvent) -> bool {
        build.has_tag(&self.schedule_tag)
    }

    /// Remaining tags of a scheduled build, identifying who it runs for
    fn organization_id(&self, build: &BuildEvent) -> Option<String> {
        if !self.is_scheduled(build) {
            return None;
        }
        let orgs: Vec<&str> = visible_tags(build)
            .filter(|t| *t != self.schedule_tag)
            .collect();
        if orgs.is_empty() {
            None
        } else {
            Some(orgs.join(", "))
        }
    }

    /// Build the Slack message for a build. Never fails; unknown values
    /// render as `n/a` and optional blocks are left out.
    pub fn render(&self, build: &BuildEvent) -> Message {
        let build_type = if self.is_scheduled(build) {
            "Schedule"
        } else {
            "Build"
        };
        let organization_id = self.organization_id(build);

        let target = organization_id
            .as_deref()
            .or(build.branch_name())
            .unwrap_or(&build.id);
        let summary = format!("{}: {} for {}", build.status.description(), build_type, target);

        let mut blocks = Vec::with_capacity(5);

        let log_link = match build.log_url.as_deref() {
            Some(url) if !url.is_empty() => format!("<{}|View build log>", url),
            _ => NOT_AVAILABLE.to_string(),
        };
        blocks.push(Block::context([
            format!("*Logs:* {}", log_link),
            format!("*Started:* {}", format_timestamp(build.start_time.as_deref())),
            format!("*Finished:* {}", format_timestamp(build.finish_time.as_deref())),
        ]));

        blocks.push(Block::context([
            format!("*Type:* {}", build_type),
            format!("*Status:* {}", build.status.description()),
        ]));

        if build_type == "Schedule" {
            blocks.push(Block::section(format!(
                "*Organization:* {}",
                organization_id.as_deref().unwrap_or(NOT_AVAILABLE)
            )));
        }

        let repo_name = build.repo_name();
        let branch_name = build.branch_name();
        let commit_sha = build.commit_sha();
        if repo_name.is_some() || branch_name.is_some() || commit_sha.is_some() {
            blocks.push(Block::fields([
                format!("*Repository:*\n{}", repo_name.unwrap_or(NOT_AVAILABLE)),
                format!("*Branch:*\n{}", branch_name.unwrap_or(NOT_AVAILABLE)),
                format!("*Commit:*\n{}", commit_link(build)),
                format!("*Tag:*\n{}", build.tag_name().unwrap_or(NOT_AVAILABLE)),
            ]));
        }

        let tags: Vec<String> = visible_tags(build).map(|t| format!("`{}`", t)).collect();
        if !tags.is_empty() {
            blocks.push(Block::context([format!("*Tags:* {}", tags.join(" "))]));
        }

        Message::new(summary, build.status.color(), blocks)
    }
}

fn visible_tags(build: &BuildEvent) -> impl Iterator<Item = &str> {
    build
        .tags
        .iter()
        .map(String::as_str)
        .filter(|t| !t.starts_with(TRIGGER_TAG_PREFIX))
}

/// Link to the commit in the source browser, or `n/a` unless the project,
/// repository and commit are all known.
fn commit_link(build: &BuildEvent) -> String {
    match (build.source_project_id(), build.repo_name(), build.commit_sha()) {
        (Some(project_id), Some(repo_name), Some(sha)) => {
            let short: String = sha.chars().take(SHORT_SHA_LEN).collect();
            format!(
                "<{}/{}/{}/+/{}|`{}`>",
                SOURCE_BROWSER_URL, project_id, repo_name, sha, short
            )
        }
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Slack date token, shown in the reader's timezone with the original
/// literal as fallback.
fn format_timestamp(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return NOT_AVAILABLE.to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => format!(
            "<!date^{}^{{date_short_pretty}} at {{time}}|{}>",
            parsed.timestamp(),
            raw
        ),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Block;
    use serde_json::json;

    fn build(value: serde_json::Value) -> BuildEvent {
        serde_json::from_value(value).unwrap()
    }

    fn all_texts(message: &Message) -> Vec<String> {
        message
            .blocks()
            .iter()
            .flat_map(|b| b.texts())
            .map(String::from)
            .collect()
    }

    fn find_text<'a>(message: &'a Message, prefix: &str) -> Option<&'a str> {
        message
            .blocks()
            .iter()
            .flat_map(|b| b.texts())
            .find(|t| t.starts_with(prefix))
    }

    fn end_to_end_build() -> serde_json::Value {
        json!({
            "id": "build-1",
            "status": "SUCCESS",
            "logUrl": "https://x/log",
            "startTime": "2024-01-01T00:00:00Z",
            "finishTime": "2024-01-01T00:10:00Z",
            "images": [],
            "substitutions": {
                "REPO_NAME": "svc",
                "BRANCH_NAME": "main",
                "COMMIT_SHA": "abcdef1234567"
            },
            "tags": []
        })
    }

    #[test]
    fn test_end_to_end_summary_without_project() {
        let message = render(&build(end_to_end_build()));

        assert_eq!(message.text, "Build successfully completed: Build for main");
        assert_eq!(message.color(), Some("#34a853"));
        assert_eq!(find_text(&message, "*Commit:*"), Some("*Commit:*\nn/a"));
        assert_eq!(find_text(&message, "*Repository:*"), Some("*Repository:*\nsvc"));
        assert_eq!(find_text(&message, "*Branch:*"), Some("*Branch:*\nmain"));
        assert_eq!(find_text(&message, "*Tag:*"), Some("*Tag:*\nn/a"));
    }

    #[test]
    fn test_commit_link_with_project() {
        let mut value = end_to_end_build();
        value["source"] = json!({"repoSource": {"projectId": "proj"}});
        let message = render(&build(value));

        assert_eq!(
            find_text(&message, "*Commit:*"),
            Some("*Commit:*\n<https://source.cloud.google.com/proj/svc/+/abcdef1234567|`abcdef1`>")
        );
    }

    #[test]
    fn test_timestamps_render_as_date_tokens() {
        let message = render(&build(end_to_end_build()));
        let logs = message.blocks()[0].texts();

        assert_eq!(logs[0], "*Logs:* <https://x/log|View build log>");
        assert_eq!(
            logs[1],
            "*Started:* <!date^1704067200^{date_short_pretty} at {time}|2024-01-01T00:00:00Z>"
        );
        assert_eq!(
            logs[2],
            "*Finished:* <!date^1704067800^{date_short_pretty} at {time}|2024-01-01T00:10:00Z>"
        );
    }

    #[test]
    fn test_missing_and_unparseable_timestamps() {
        let message = render(&build(json!({
            "id": "b1",
            "status": "WORKING",
            "startTime": "yesterday"
        })));
        let logs = message.blocks()[0].texts();

        assert_eq!(logs[0], "*Logs:* n/a");
        assert_eq!(logs[1], "*Started:* yesterday");
        assert_eq!(logs[2], "*Finished:* n/a");
    }

    #[test]
    fn test_minimal_build_renders_only_mandatory_blocks() {
        let message = render(&build(json!({"id": "b1", "status": "QUEUED"})));

        assert_eq!(message.text, "New build queued: Build for b1");
        assert_eq!(message.blocks().len(), 2);
        assert_eq!(
            message.blocks()[1],
            Block::context(["*Type:* Build", "*Status:* New build queued"])
        );
    }

    #[test]
    fn test_tag_block_hides_trigger_tags() {
        let message = render(&build(json!({
            "id": "b1",
            "status": "FAILURE",
            "tags": ["trigger-abc", "nightly"]
        })));
        assert_eq!(find_text(&message, "*Tags:*"), Some("*Tags:* `nightly`"));

        let message = render(&build(json!({
            "id": "b1",
            "status": "FAILURE",
            "tags": ["trigger-abc"]
        })));
        assert_eq!(find_text(&message, "*Tags:*"), None);
        assert_eq!(message.blocks().len(), 2);
    }

    #[test]
    fn test_unknown_status_uses_neutral_entry() {
        let message = render(&build(json!({"id": "b1", "status": "BOGUS"})));
        assert_eq!(message.text, "Unknown build status: Build for b1");
        assert_eq!(message.color(), Some("#444444"));
    }

    #[test]
    fn test_scheduled_build_summary_and_organization() {
        let message = render(&build(json!({
            "id": "b1",
            "status": "FAILURE",
            "tags": ["schedule", "team-x", "trigger-123"]
        })));

        assert_eq!(message.text, "Build failed: Schedule for team-x");
        assert_eq!(message.color(), Some("#ea4335"));
        assert_eq!(find_text(&message, "*Type:*"), Some("*Type:* Schedule"));
        assert_eq!(
            message.blocks()[2],
            Block::section("*Organization:* team-x")
        );
        assert_eq!(
            find_text(&message, "*Tags:*"),
            Some("*Tags:* `schedule` `team-x`")
        );
    }

    #[test]
    fn test_schedule_without_organization_falls_back() {
        let message = render(&build(json!({
            "id": "b1",
            "status": "TIMEOUT",
            "tags": ["schedule"],
            "substitutions": {"BRANCH_NAME": "release"}
        })));

        assert_eq!(message.text, "Build timed out: Schedule for release");
        assert_eq!(
            message.blocks()[2],
            Block::section("*Organization:* n/a")
        );
    }

    #[test]
    fn test_custom_schedule_tag() {
        let formatter = Formatter::new("cron");
        let message = formatter.render(&build(json!({
            "id": "b1",
            "status": "SUCCESS",
            "tags": ["cron", "acme", "billing"]
        })));
        assert_eq!(message.text, "Build successfully completed: Schedule for acme, billing");
    }

    #[test]
    fn test_render_is_deterministic() {
        let event = build(json!({
            "id": "b1",
            "status": "FAILURE",
            "logUrl": "https://x/log",
            "startTime": "2024-01-01T00:00:00Z",
            "tags": ["schedule", "team-x", "nightly"],
            "substitutions": {"REPO_NAME": "svc", "REVISION_ID": "0123456789"},
            "source": {"repoSource": {"projectId": "proj", "branchName": "dev"}},
            "sourceProvenance": {"resolvedRepoSource": {"tagName": "v1.2.0"}}
        }));

        let first = serde_json::to_vec(&render(&event)).unwrap();
        let second = serde_json::to_vec(&render(&event)).unwrap();
        assert_eq!(first, second);
        assert!(all_texts(&render(&event)).iter().any(|t| t == "*Tag:*\nv1.2.0"));
    }
}
