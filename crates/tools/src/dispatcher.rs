//! Action dispatcher: executes one named action against a conversation's
//! browser session and normalizes every outcome into an [`ActionResult`].

use browserpilot_browser::SessionManager;
use browserpilot_core::config::BrowserConfig;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Paths;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ActionRegistry;

/// Owns the action registry and the per-conversation browser sessions.
///
/// `dispatch` never propagates a fault: unknown names, invalid arguments,
/// browser launch failures, and action-level errors all come back as
/// error-flagged results, so the orchestration loop can fold them into the
/// transcript and continue.
pub struct Dispatcher {
    registry: ActionRegistry,
    sessions: Mutex<SessionManager>,
}

impl Dispatcher {
    pub fn new(registry: ActionRegistry, paths: &Paths, browser_config: BrowserConfig) -> Self {
        Self {
            registry,
            sessions: Mutex::new(SessionManager::new(paths.browser_dir(), browser_config)),
        }
    }

    /// The action catalog, for the model provider.
    pub fn catalog(&self) -> Vec<Value> {
        self.registry.schemas()
    }

    /// Execute one action for one conversation.
    pub async fn dispatch(&self, conversation: &str, name: &str, args: &Value) -> ActionResult {
        let action = match self.registry.get(name) {
            Some(action) => action.clone(),
            None => {
                warn!(action = name, "Unknown tool requested");
                return ActionResult::error(format!("Unknown tool: {}", name));
            }
        };

        if let Err(e) = action.validate(args) {
            warn!(action = name, error = %e, "Action validation failed");
            return ActionResult::error(e.to_string());
        }

        // The browser is launched lazily on the conversation's first action.
        let mut sessions = self.sessions.lock().await;
        let session = match sessions.get_or_create(conversation).await {
            Ok(session) => session,
            Err(e) => {
                warn!(session = conversation, error = %e, "Browser session unavailable");
                return ActionResult::error(format!("Failed to acquire browser session: {}", e));
            }
        };

        debug!(session = conversation, action = name, "Executing action");
        match action.run(session, args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(session = conversation, action = name, error = %e, "Action failed");
                ActionResult::error(e.to_string())
            }
        }
    }

    /// Close the conversation's browser session, if one is live.
    pub async fn release(&self, conversation: &str) {
        let mut sessions = self.sessions.lock().await;
        sessions.close_session(conversation).await;
    }

    /// Close every live browser session.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        sessions.close_all().await;
    }
}
