pub mod actions_cmd;
pub mod chat;
pub mod gateway;
pub mod onboard;

use std::sync::Arc;

use browserpilot_agent::AgentRuntime;
use browserpilot_core::{Config, Paths};
use browserpilot_providers::{create_provider, Provider};
use browserpilot_tools::{ActionRegistry, Dispatcher};

/// Wire the shared catalog + loop stack used by every front end.
pub(crate) fn build_runtime(config: Config, paths: &Paths) -> anyhow::Result<AgentRuntime> {
    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config)?);
    let dispatcher = Arc::new(Dispatcher::new(
        ActionRegistry::with_defaults(),
        paths,
        config.browser.clone(),
    ));
    Ok(AgentRuntime::new(config, provider, dispatcher))
}
