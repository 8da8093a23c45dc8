use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A single content block within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded image bytes.
        data: String,
        media_type: String,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

/// A message in the running conversation the execution loop maintains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    /// Tool calls requested by the assistant in this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentBlock::Text { text: text.into() }],
            tool_calls: vec![],
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::text(Role::Assistant, text);
        msg.tool_calls = tool_calls;
        msg
    }

    /// A tool-role message carrying the result of one tool call.
    pub fn tool_result(tool_call_id: &str, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: vec![ContentBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
            }],
            tool_calls: vec![],
            timestamp: Utc::now(),
        }
    }

    /// A user-role message carrying a JPEG screenshot plus an instruction.
    /// Used for the post-action vision feedback step.
    pub fn user_screenshot(jpeg: &[u8], instruction: &str) -> Self {
        Self {
            role: Role::User,
            content: vec![
                ContentBlock::Image {
                    data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                    media_type: "image/jpeg".into(),
                },
                ContentBlock::Text {
                    text: instruction.into(),
                },
            ],
            tool_calls: vec![],
            timestamp: Utc::now(),
        }
    }

    /// All text content joined together.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, ContentBlock::Image { .. }))
    }
}
