use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

pub struct ClickAction;

#[async_trait]
impl Action for ClickAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "click",
            description: "Click an element on the page",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "locator": {
                        "type": "string",
                        "description": "CSS selector resolved against the page; the first matching element is clicked",
                    },
                },
                "required": ["locator"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "locator", "click")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let locator = require_str(args, "locator", "click")?;

        match session.click(locator).await {
            Ok(()) => Ok(ActionResult::text(format!("Clicked {}", locator))),
            Err(cause) => Ok(ActionResult::error(format!(
                "Failed to click {}: {}",
                locator, cause
            ))),
        }
    }
}
