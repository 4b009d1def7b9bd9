use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

pub struct NavigateAction;

#[async_trait]
impl Action for NavigateAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "navigate",
            description: "Navigate to a URL",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "Absolute URL to load" },
                },
                "required": ["url"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "url", "navigate")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let url = require_str(args, "url", "navigate")?;

        if let Err(e) = url::Url::parse(url) {
            return Ok(ActionResult::error(format!(
                "Failed to navigate to {}: invalid URL ({})",
                url, e
            )));
        }

        match session.goto(url).await {
            Ok(()) => Ok(ActionResult::text(format!("Navigated to {}", url))),
            Err(cause) => Ok(ActionResult::error(format!(
                "Failed to navigate to {}: {}",
                url, cause
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = NavigateAction.schema();
        assert_eq!(schema.name, "navigate");
        assert_eq!(schema.input_schema["required"][0], "url");
    }

    #[test]
    fn test_validate() {
        assert!(NavigateAction
            .validate(&json!({"url": "https://example.com"}))
            .is_ok());
        assert!(NavigateAction.validate(&json!({})).is_err());
        assert!(NavigateAction.validate(&json!({"url": 42})).is_err());
    }
}
