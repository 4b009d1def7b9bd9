pub mod runtime;
pub mod session_store;

use async_trait::async_trait;
use browserpilot_core::types::ActionResult;
use serde_json::Value;

pub use runtime::AgentRuntime;
pub use session_store::SessionStore;

/// The orchestration loop's view of the action dispatcher. Kept as a trait
/// so the loop can be exercised against stubs without a live browser.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// The action catalog submitted alongside every provider call.
    fn catalog(&self) -> Vec<Value>;
    /// Execute one action; must never fail at the transport level.
    async fn dispatch(&self, conversation: &str, name: &str, args: &Value) -> ActionResult;
    /// Release the conversation's browser resources, if any.
    async fn release(&self, conversation: &str);
}

#[async_trait]
impl ActionDispatcher for browserpilot_tools::Dispatcher {
    fn catalog(&self) -> Vec<Value> {
        browserpilot_tools::Dispatcher::catalog(self)
    }

    async fn dispatch(&self, conversation: &str, name: &str, args: &Value) -> ActionResult {
        browserpilot_tools::Dispatcher::dispatch(self, conversation, name, args).await
    }

    async fn release(&self, conversation: &str) {
        browserpilot_tools::Dispatcher::release(self, conversation).await
    }
}
