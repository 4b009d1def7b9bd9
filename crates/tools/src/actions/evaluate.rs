use async_trait::async_trait;
use browserpilot_browser::BrowserSession;
use browserpilot_core::types::ActionResult;
use browserpilot_core::Result;
use serde_json::{json, Value};

use crate::{require_str, Action, ActionSchema};

/// Replaces console.log/info/warn/error with recording wrappers. Installed
/// before the caller script runs so its console output can be retrieved.
const INSTALL_CONSOLE_HOOK: &str = r#"(function () {
  window.__consoleCapture = {
    logs: [],
    original: { log: console.log, info: console.info, warn: console.warn, error: console.error }
  };
  ['log', 'info', 'warn', 'error'].forEach(function (level) {
    console[level] = function () {
      var args = Array.prototype.slice.call(arguments);
      window.__consoleCapture.logs.push('[' + level + '] ' + args.join(' '));
      window.__consoleCapture.original[level].apply(console, args);
    };
  });
})()"#;

/// Restores the original console and drains the captured lines. Must run on
/// success and error paths alike so a failed script never leaves a stale
/// intercepted console behind.
const COLLECT_CONSOLE_HOOK: &str = r#"(function () {
  if (!window.__consoleCapture) return [];
  Object.assign(console, window.__consoleCapture.original);
  var logs = window.__consoleCapture.logs;
  delete window.__consoleCapture;
  return logs;
})()"#;

pub struct EvaluateAction;

#[async_trait]
impl Action for EvaluateAction {
    fn schema(&self) -> ActionSchema {
        ActionSchema {
            name: "evaluate",
            description: "Execute JavaScript in the browser console",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "script": { "type": "string", "description": "JavaScript code to execute" },
                },
                "required": ["script"],
            }),
        }
    }

    fn validate(&self, args: &Value) -> Result<()> {
        require_str(args, "script", "evaluate")?;
        Ok(())
    }

    async fn run(&self, session: &mut BrowserSession, args: &Value) -> Result<ActionResult> {
        let script = require_str(args, "script", "evaluate")?;

        if let Err(cause) = session.cdp.evaluate_js(INSTALL_CONSOLE_HOOK).await {
            return Ok(ActionResult::error(format!(
                "Failed to install console capture: {}",
                cause
            )));
        }

        let outcome: std::result::Result<Value, String> =
            match session.cdp.evaluate_js(script).await {
                Ok(raw) => match raw.get("exceptionDetails") {
                    Some(details) => Err(exception_text(details)),
                    None => Ok(raw
                        .get("result")
                        .and_then(|r| r.get("value"))
                        .cloned()
                        .unwrap_or(Value::Null)),
                },
                Err(transport) => Err(transport),
            };

        let shot = match &outcome {
            Ok(_) => session.screenshot(false).await.ok(),
            Err(_) => None,
        };

        // Cleanup runs regardless of how the script ended.
        let console_text = match session.cdp.evaluate_js(COLLECT_CONSOLE_HOOK).await {
            Ok(raw) => raw
                .get("result")
                .and_then(|r| r.get("value"))
                .and_then(|v| v.as_array())
                .map(|lines| {
                    lines
                        .iter()
                        .filter_map(|line| line.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        match outcome {
            Ok(value) => {
                let rendered = serde_json::to_string_pretty(&value)
                    .unwrap_or_else(|_| value.to_string());
                let mut result = ActionResult::text(format!(
                    "Execution result:\n{}\n\nConsole output:\n{}",
                    rendered, console_text
                ));
                if let Some(data) = shot {
                    result = result.with_png(data);
                }
                Ok(result)
            }
            Err(cause) => Ok(ActionResult::error(format!(
                "Script execution failed: {}\n\nConsole output:\n{}",
                cause, console_text
            ))),
        }
    }
}

fn exception_text(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(|v| v.as_str())
        .or_else(|| details.get("text").and_then(|v| v.as_str()))
        .unwrap_or("unknown script error")
        .to_string()
}
