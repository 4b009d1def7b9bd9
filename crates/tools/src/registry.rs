use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::actions::click::ClickAction;
use crate::actions::evaluate::EvaluateAction;
use crate::actions::fill::FillAction;
use crate::actions::find_locators::FindLocatorsAction;
use crate::actions::highlight::HighlightAction;
use crate::actions::navigate::NavigateAction;
use crate::actions::screenshot::ScreenshotAction;
use crate::Action;

/// Registry mapping action name to its typed handler.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Registry with the full canonical action set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NavigateAction));
        registry.register(Arc::new(ScreenshotAction));
        registry.register(Arc::new(ClickAction));
        registry.register(Arc::new(FillAction));
        registry.register(Arc::new(HighlightAction));
        registry.register(Arc::new(FindLocatorsAction));
        registry.register(Arc::new(EvaluateAction));
        registry
    }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        let schema = action.schema();
        debug!(name = schema.name, "Registering action");
        self.actions.insert(schema.name.to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Action>> {
        self.actions.get(name)
    }

    /// All registered action names, sorted for a stable catalog.
    pub fn action_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }

    /// The action catalog in the Anthropic tool format:
    /// `{name, description, input_schema}`.
    pub fn schemas(&self) -> Vec<Value> {
        self.action_names()
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|action| {
                let schema = action.schema();
                json!({
                    "name": schema.name,
                    "description": schema.description,
                    "input_schema": schema.input_schema,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_empty() {
        let registry = ActionRegistry::new();
        assert!(registry.action_names().is_empty());
        assert!(registry.get("navigate").is_none());
    }

    #[test]
    fn test_with_defaults_has_canonical_set() {
        let registry = ActionRegistry::with_defaults();
        let names = registry.action_names();
        assert_eq!(
            names,
            vec![
                "click",
                "evaluate",
                "fill",
                "find_locators",
                "highlight",
                "navigate",
                "screenshot",
            ]
        );
    }

    #[test]
    fn test_schemas_shape() {
        let registry = ActionRegistry::with_defaults();
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 7);
        for schema in &schemas {
            assert!(schema["name"].is_string());
            assert!(schema["description"].is_string());
            assert_eq!(schema["input_schema"]["type"], "object");
        }
    }

    #[test]
    fn test_schemas_stable_order() {
        let registry = ActionRegistry::with_defaults();
        let first: Vec<String> = registry
            .schemas()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        let second: Vec<String> = registry
            .schemas()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(first, second);
    }
}
