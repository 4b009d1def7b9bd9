use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{Action, ActionSchema};

pub struct FindLocatorsAction;

#[async_trait]
impl Action for FindLocatorsAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "find_locators",
            description: "Get a list of interactive elements on the current page",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Only return elements whose accessible name contains this text",
                    },
                },
            }),
        }
    }

    fn validate(&self, _args: &Value) -> Result<()> {
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let text_filter = args.get("text").and_then(|v| v.as_str());

        let elements = match session.interactive_elements(text_filter).await {
            Ok(elements) => elements,
            Err(cause) => {
                return Ok(ActionResult::error(format!(
                    "Failed to find interactive elements: {}",
                    cause
                )));
            }
        };

        // All matches, no pagination; callers must tolerate the size.
        let descriptors: Vec<String> = elements.iter().map(|el| el.descriptor()).collect();
        Ok(ActionResult::text(serde_json::to_string(&descriptors)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let schema = FindLocatorsAction.schema();
        assert_eq!(schema.name, "find_locators");
        // No required arguments.
        assert!(schema.input_schema.get("required").is_none());
    }

    #[test]
    fn test_validate_accepts_anything() {
        assert!(FindLocatorsAction.validate(&json!({})).is_ok());
        assert!(FindLocatorsAction.validate(&json!({"text": "Submit"})).is_ok());
    }
}
