pub mod anthropic;

use async_trait::async_trait;
use browserpilot_core::types::{Message, ModelReply};
use browserpilot_core::{Config, Error, Result};
use serde_json::Value;

/// Model collaborator contract: submit a transcript plus the action catalog,
/// receive content blocks and a stop indicator.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, messages: &[Message], tools: &[Value]) -> Result<ModelReply>;
}

pub use anthropic::AnthropicProvider;

/// Build the configured provider. Only Anthropic is wired up; the API key
/// comes from config or the `ANTHROPIC_API_KEY` environment variable.
pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let api_key = config.anthropic_api_key().ok_or_else(|| {
        Error::Config(
            "No Anthropic API key configured. Set providers.anthropic.apiKey in config.json \
             or export ANTHROPIC_API_KEY."
                .to_string(),
        )
    })?;

    Ok(Box::new(AnthropicProvider::new(
        &api_key,
        config.anthropic_api_base().as_deref(),
        &config.agent.model,
        config.agent.max_tokens,
        config.agent.temperature,
        std::time::Duration::from_secs(config.agent.request_timeout_secs),
    )))
}
