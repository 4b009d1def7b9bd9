use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

const LOCATOR_DESCRIPTION: &str =
    "CSS selector resolved against the page; the first matching element is used";

pub struct ScreenshotAction;

#[async_trait]
impl Action for ScreenshotAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "screenshot",
            description: "Take a screenshot of the current page or a specific element",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name for the screenshot" },
                    "locator": { "type": "string", "description": LOCATOR_DESCRIPTION },
                    "fullpage": { "type": "boolean", "description": "Screenshot of the full scrollable page", "default": false },
                },
                "required": ["name"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "name", "screenshot")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let name = require_str(args, "name", "screenshot")?;
        let fullpage = args
            .get("fullpage")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let locator = args.get("locator").and_then(|v| v.as_str());

        let captured = match locator {
            Some(selector) => session.screenshot_element(selector).await,
            None => session.screenshot(fullpage).await,
        };

        let data = match captured {
            Ok(data) => data,
            Err(cause) => {
                return Ok(ActionResult::error(format!(
                    "Failed to capture screenshot '{}': {}",
                    name, cause
                )));
            }
        };

        let scope = match locator {
            Some(selector) => format!("element {}", selector),
            None if fullpage => "full page".to_string(),
            None => "viewport".to_string(),
        };

        // Overwrites any prior screenshot cached under the same name.
        session.shots.insert(name.to_string(), data.clone());

        Ok(ActionResult::text(format!("Screenshot '{}' captured ({})", name, scope)).with_png(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = ScreenshotAction.schema();
        assert_eq!(schema.name, "screenshot");
        assert_eq!(schema.input_schema["required"][0], "name");
        assert!(schema.input_schema["properties"]["locator"].is_object());
        assert!(schema.input_schema["properties"]["fullpage"].is_object());
    }

    #[test]
    fn test_validate() {
        assert!(ScreenshotAction.validate(&json!({"name": "home"})).is_ok());
        assert!(ScreenshotAction
            .validate(&json!({"name": "home", "fullpage": true}))
            .is_ok());
        assert!(ScreenshotAction.validate(&json!({})).is_err());
    }
}
