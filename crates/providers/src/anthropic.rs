use async_trait::async_trait;
use browserpilot_core::types::{ContentBlock, Message, ModelReply, StopReason};
use browserpilot_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::Provider;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.to_string(),
            api_base: api_base
                .unwrap_or(ANTHROPIC_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Strip the "anthropic/" prefix from model names for the API.
    /// Config may store "anthropic/claude-3-5-sonnet-latest" but the API
    /// expects "claude-3-5-sonnet-latest".
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("anthropic/").unwrap_or(model)
    }

    /// Messages and catalog entries are already in the Anthropic wire shape,
    /// so the request body is a straight assembly.
    fn build_request(&self, messages: &[Message], tools: &[Value]) -> Result<Value> {
        let mut request = serde_json::json!({
            "model": Self::normalize_model(&self.model),
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": serde_json::to_value(messages)?,
        });

        if !tools.is_empty() {
            request["tools"] = Value::Array(tools.to_vec());
        }

        Ok(request)
    }

    fn parse_stop_reason(stop_reason: Option<&str>) -> StopReason {
        match stop_reason {
            Some("tool_use") => StopReason::ToolUse,
            Some("end_turn") | None => StopReason::EndTurn,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    }

    fn parse_content(blocks: &[WireBlock]) -> Vec<ContentBlock> {
        let mut content = Vec::new();
        for block in blocks {
            match block.block_type.as_str() {
                "text" => {
                    if let Some(text) = &block.text {
                        if !text.is_empty() {
                            content.push(ContentBlock::Text { text: text.clone() });
                        }
                    }
                }
                "tool_use" => {
                    if let (Some(id), Some(name)) = (&block.id, &block.name) {
                        content.push(ContentBlock::ToolUse {
                            id: id.clone(),
                            name: name.clone(),
                            input: block
                                .input
                                .clone()
                                .unwrap_or(Value::Object(serde_json::Map::new())),
                        });
                    }
                }
                _ => {}
            }
        }
        content
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat(&self, messages: &[Message], tools: &[Value]) -> Result<ModelReply> {
        let url = format!("{}/messages", self.api_base);
        let request = self.build_request(messages, tools)?;

        info!(
            url = %url,
            model = %Self::normalize_model(&self.model),
            tools_count = tools.len(),
            messages_count = messages.len(),
            "Calling Anthropic API"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Anthropic API error");
            return Err(Error::Provider(format!(
                "Anthropic API error {}: {}",
                status, raw_body
            )));
        }

        debug!(body_len = raw_body.len(), "Anthropic raw response");

        let resp: WireResponse = serde_json::from_str(&raw_body).map_err(|e| {
            Error::Provider(format!(
                "Failed to parse Anthropic response: {}. Body: {}",
                e,
                &raw_body[..raw_body.len().min(500)]
            ))
        })?;

        let content = Self::parse_content(&resp.content);
        let stop_reason = Self::parse_stop_reason(resp.stop_reason.as_deref());

        let usage = serde_json::json!({
            "input_tokens": resp.usage.as_ref().and_then(|u| u.input_tokens),
            "output_tokens": resp.usage.as_ref().and_then(|u| u.output_tokens),
        });

        info!(
            blocks = content.len(),
            stop_reason = ?stop_reason,
            "Anthropic response parsed"
        );

        Ok(ModelReply {
            content,
            stop_reason,
            usage,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<WireBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(
            "sk-test",
            None,
            "anthropic/claude-3-5-sonnet-latest",
            1024,
            0.7,
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_normalize_model() {
        assert_eq!(
            AnthropicProvider::normalize_model("anthropic/claude-3-5-sonnet-latest"),
            "claude-3-5-sonnet-latest"
        );
        assert_eq!(
            AnthropicProvider::normalize_model("claude-3-5-sonnet-latest"),
            "claude-3-5-sonnet-latest"
        );
    }

    #[test]
    fn test_build_request() {
        let messages = vec![Message::user("go to example.com")];
        let tools = vec![serde_json::json!({
            "name": "navigate",
            "description": "Navigate to a URL",
            "input_schema": {"type": "object", "properties": {"url": {"type": "string"}}, "required": ["url"]}
        })];

        let request = provider().build_request(&messages, &tools).unwrap();
        assert_eq!(request["model"], "claude-3-5-sonnet-latest");
        assert_eq!(request["max_tokens"], 1024);
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(request["messages"][0]["content"][0]["type"], "text");
        assert_eq!(request["tools"][0]["name"], "navigate");
    }

    #[test]
    fn test_build_request_omits_empty_tools() {
        let request = provider()
            .build_request(&[Message::user("hi")], &[])
            .unwrap();
        assert!(request.get("tools").is_none());
    }

    #[test]
    fn test_parse_response_with_tool_use() {
        let json = r#"{
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "I'll open that page."},
                {"type": "tool_use", "id": "toolu_1", "name": "navigate", "input": {"url": "https://example.com"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 100, "output_tokens": 50}
        }"#;

        let resp: WireResponse = serde_json::from_str(json).unwrap();
        let content = AnthropicProvider::parse_content(&resp.content);
        assert_eq!(content.len(), 2);
        assert!(matches!(&content[0], ContentBlock::Text { text } if text.contains("open")));
        match &content[1] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_1");
                assert_eq!(name, "navigate");
                assert_eq!(input["url"], "https://example.com");
            }
            other => panic!("expected tool_use, got {:?}", other),
        }
        assert!(AnthropicProvider::parse_stop_reason(resp.stop_reason.as_deref()).is_tool_use());
    }

    #[test]
    fn test_parse_stop_reason_variants() {
        assert_eq!(
            AnthropicProvider::parse_stop_reason(Some("end_turn")),
            StopReason::EndTurn
        );
        assert_eq!(
            AnthropicProvider::parse_stop_reason(Some("max_tokens")),
            StopReason::MaxTokens
        );
        assert_eq!(
            AnthropicProvider::parse_stop_reason(Some("pause_turn")),
            StopReason::Other("pause_turn".to_string())
        );
        assert_eq!(
            AnthropicProvider::parse_stop_reason(None),
            StopReason::EndTurn
        );
    }

    #[test]
    fn test_parse_content_skips_unknown_blocks() {
        let blocks = vec![
            WireBlock {
                block_type: "thinking".to_string(),
                text: Some("hmm".to_string()),
                id: None,
                name: None,
                input: None,
            },
            WireBlock {
                block_type: "text".to_string(),
                text: Some("done".to_string()),
                id: None,
                name: None,
                input: None,
            },
        ];
        let content = AnthropicProvider::parse_content(&blocks);
        assert_eq!(content.len(), 1);
    }
}
