use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

pub struct FillAction;

#[async_trait]
impl Action for FillAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "fill",
            description: "Fill out an input field",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "locator": {
                        "type": "string",
                        "description": "CSS selector resolved against the page; the first matching input is filled",
                    },
                    "value": { "type": "string", "description": "Value to fill" },
                },
                "required": ["locator", "value"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "locator", "fill")?;
        require_str(args, "value", "fill")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let locator = require_str(args, "locator", "fill")?;
        let value = require_str(args, "value", "fill")?;

        match session.fill(locator, value).await {
            Ok(()) => Ok(ActionResult::text(format!(
                "Filled {} with: {}",
                locator, value
            ))),
            Err(cause) => Ok(ActionResult::error(format!(
                "Failed to fill {}: {}",
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
        let schema = FillAction.schema();
        assert_eq!(schema.name, "fill");
        let required = schema.input_schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn test_validate() {
        assert!(FillAction
            .validate(&json!({"locator": "#q", "value": "rust"}))
            .is_ok());
        assert!(FillAction.validate(&json!({"locator": "#q"})).is_err());
        assert!(FillAction.validate(&json!({"value": "rust"})).is_err());
    }
}
