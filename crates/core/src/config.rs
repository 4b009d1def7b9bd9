use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum provider round-trips per user utterance. Exceeding it is a
    /// distinct terminal error, not a silent infinite loop.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    #[serde(default = "default_llm_max_retries")]
    pub llm_max_retries: u32,
    #[serde(default = "default_llm_retry_delay_ms")]
    pub llm_retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_rounds() -> u32 {
    12
}

fn default_llm_max_retries() -> u32 {
    3
}

fn default_llm_retry_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_tool_rounds: default_max_tool_rounds(),
            llm_max_retries: default_llm_max_retries(),
            llm_retry_delay_ms: default_llm_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Explicit browser binary path. When unset, common Chrome/Chromium
    /// install locations and PATH are probed.
    #[serde(default)]
    pub binary: Option<String>,
    /// Delay after click/fill so page reactions land before a follow-up
    /// capture.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_navigate_wait_ms")]
    pub navigate_wait_ms: u64,
    #[serde(default = "default_cdp_command_timeout_secs")]
    pub cdp_command_timeout_secs: u64,
}

fn default_headless() -> bool {
    true
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_navigate_wait_ms() -> u64 {
    1500
}

fn default_cdp_command_timeout_secs() -> u64 {
    30
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            binary: None,
            settle_delay_ms: default_settle_delay_ms(),
            navigate_wait_ms: default_navigate_wait_ms(),
            cdp_command_timeout_secs: default_cdp_command_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8788
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("anthropic".to_string(), ProviderConfig::default());

        Self {
            providers,
            agent: AgentConfig::default(),
            browser: BrowserConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the Anthropic API key: config first, `ANTHROPIC_API_KEY`
    /// environment variable as fallback.
    pub fn anthropic_api_key(&self) -> Option<String> {
        if let Some(provider) = self.providers.get("anthropic") {
            if !provider.api_key.is_empty() {
                return Some(provider.api_key.clone());
            }
        }
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
    }

    pub fn anthropic_api_base(&self) -> Option<String> {
        self.providers
            .get("anthropic")
            .and_then(|provider| provider.api_base.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent.model, "claude-3-5-sonnet-latest");
        assert_eq!(config.agent.max_tool_rounds, 12);
        assert!(config.browser.headless);
        assert_eq!(config.browser.settle_delay_ms, 500);
        assert!(config.providers.contains_key("anthropic"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{
  "providers": { "anthropic": { "apiKey": "sk-test" } },
  "agent": { "maxToolRounds": 4 }
}"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.agent.max_tool_rounds, 4);
        assert_eq!(config.agent.max_tokens, 1024);
        assert_eq!(config.anthropic_api_key().as_deref(), Some("sk-test"));
        assert_eq!(config.gateway.port, 8788);
    }
}
