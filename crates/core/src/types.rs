//! Transcript and tool-protocol types, serialized in the Anthropic
//! Messages wire shape so a transcript can be submitted to the provider
//! without conversion.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One logical turn in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// A user-role message carrying only `tool_result` blocks, answering the
    /// tool invocations of the preceding assistant message.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }

    /// Concatenated text of all text blocks in this message.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tool invocations requested by this message, in reply order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }
}

/// Content block tagged union, matching the Anthropic content block format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ResultPart>,
        is_error: bool,
    },
}

/// A typed part of an action result: text or an inline base64 image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultPart {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    pub fn base64_png(data: impl Into<String>) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: "image/png".to_string(),
            data: data.into(),
        }
    }
}

/// Outcome of dispatching a single action against the browser.
///
/// Transport-level success is unconditional: failures are carried in
/// `is_error` plus a text part describing what actually went wrong, never
/// raised to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub content: Vec<ResultPart>,
    pub is_error: bool,
}

impl ActionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ResultPart::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ResultPart::Text { text: text.into() }],
            is_error: true,
        }
    }

    pub fn with_png(mut self, data: impl Into<String>) -> Self {
        self.content.push(ResultPart::Image {
            source: ImageSource::base64_png(data),
        });
        self
    }

    /// Text of the first text part, empty if none.
    pub fn first_text(&self) -> &str {
        self.content
            .iter()
            .find_map(|part| match part {
                ResultPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }
}

/// Why the model stopped generating. The orchestration loop only needs to
/// distinguish "tool use requested" from everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ToolUse,
    EndTurn,
    MaxTokens,
    Other(String),
}

impl StopReason {
    pub fn is_tool_use(&self) -> bool {
        matches!(self, StopReason::ToolUse)
    }
}

/// One provider reply: content blocks plus the stop indicator.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Value,
}
