pub mod actions;
pub mod dispatcher;
pub mod registry;

use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::{Error, Result};
use serde_json::Value;

pub use dispatcher::Dispatcher;
pub use registry::ActionRegistry;

/// Static, declarative description of one action: its name, what it does,
/// and the JSON schema of its arguments. Consumed by the model provider (as
/// the tool catalog) and by the dispatcher for argument validation.
pub struct ActionSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// A typed action handler. Adding an action means implementing this trait
/// and registering it; no central branch to touch.
#[async_trait]
pub trait Action: Send + Sync {
    fn schema(&self) -> ActionSchema;
    fn validate(&self, args: &Value) -> Result<()>;
    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult>;
}

/// Fetch a required string argument or fail with a uniform message.
pub(crate) fn require_str<'a>(args: &'a Value, key: &str, action: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Action(format!("{} requires '{}'", action, key)))
}
