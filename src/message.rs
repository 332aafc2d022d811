//! Slack incoming-webhook payload types

use serde::Serialize;

/// A `mrkdwn` text object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    #[serde(rename = "type")]
    kind: &'static str,
    pub text: String,
}

impl Text {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
    Context {
        elements: Vec<Text>,
    },
}

impl Block {
    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: Some(Text::mrkdwn(text)),
            fields: Vec::new(),
        }
    }

    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Block::Section {
            text: None,
            fields: fields.into_iter().map(Text::mrkdwn).collect(),
        }
    }

    pub fn context<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Block::Context {
            elements: elements.into_iter().map(Text::mrkdwn).collect(),
        }
    }

    /// All text fragments carried by the block, in display order
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Block::Section { text, fields } => text
                .iter()
                .chain(fields.iter())
                .map(|t| t.text.as_str())
                .collect(),
            Block::Context { elements } => elements.iter().map(|t| t.text.as_str()).collect(),
        }
    }
}

/// Coloured bar holding the message blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

/// A complete Slack message, ready to be posted to a webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Plain text summary, also used for push notifications
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(text: String, color: &str, blocks: Vec<Block>) -> Self {
        Self {
            text,
            attachments: vec![Attachment {
                color: color.to_string(),
                blocks,
            }],
        }
    }

    pub fn color(&self) -> Option<&str> {
        self.attachments.first().map(|a| a.color.as_str())
    }

    pub fn blocks(&self) -> &[Block] {
        self.attachments
            .first()
            .map(|a| a.blocks.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serializes_to_slack_shape() {
        let message = Message::new(
            "Build failed: Build for main".to_string(),
            "#ea4335",
            vec![
                Block::context(["*Logs:* n/a"]),
                Block::fields(["*Repository:*\nsvc"]),
                Block::section("*Organization:* team-x"),
            ],
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "text": "Build failed: Build for main",
                "attachments": [{
                    "color": "#ea4335",
                    "blocks": [
                        {"type": "context", "elements": [{"type": "mrkdwn", "text": "*Logs:* n/a"}]},
                        {"type": "section", "fields": [{"type": "mrkdwn", "text": "*Repository:*\nsvc"}]},
                        {"type": "section", "text": {"type": "mrkdwn", "text": "*Organization:* team-x"}}
                    ]
                }]
            })
        );
    }
}
