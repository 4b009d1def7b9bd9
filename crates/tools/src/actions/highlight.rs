use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

pub struct HighlightAction;

#[async_trait]
impl Action for HighlightAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "highlight",
            description: "Highlight an element on the page",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "locator": {
                        "type": "string",
                        "description": "CSS selector resolved against the page; the first matching element is outlined",
                    },
                },
                "required": ["locator"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "locator", "highlight")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let locator = require_str(args, "locator", "highlight")?;

        match session.highlight(locator).await {
            Ok(()) => Ok(ActionResult::text(format!("Highlighted {}", locator))),
            Err(cause) => Ok(ActionResult::error(format!(
                "Failed to highlight {}: {}",
                locator, cause
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        assert_eq!(HighlightAction.schema().name, "highlight");
    }

    #[test]
    fn test_validate() {
        assert!(HighlightAction.validate(&json!({"locator": ".cta"})).is_ok());
        assert!(HighlightAction.validate(&json!({})).is_err());
    }
}
