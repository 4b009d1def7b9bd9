//! Accessibility-tree element enumeration.
//!
//! `Accessibility.getFullAXTree` returns a flat node array; enumeration
//! filters it down to the semantic roles an agent can act on and produces a
//! human-readable descriptor per match.

use serde_json::Value;

/// Roles surfaced by `find_locators`.
pub const SEMANTIC_ROLES: &[&str] = &[
    "button",
    "textbox",
    "combobox",
    "link",
    "checkbox",
    "radio",
    "tab",
    "tabpanel",
    "menu",
    "menuitem",
    "listbox",
    "option",
    "dialog",
    "alert",
    "tooltip",
    "slider",
    "spinbutton",
    "searchbox",
    "progressbar",
    "switch",
];

/// One interactive element surfaced from the accessibility tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AxElement {
    pub role: String,
    pub name: String,
    pub disabled: bool,
}

impl AxElement {
    /// Human-readable descriptor, e.g. `button "Submit"`.
    pub fn descriptor(&self) -> String {
        let mut out = if self.name.is_empty() {
            self.role.clone()
        } else {
            format!("{} \"{}\"", self.role, self.name)
        };
        if self.disabled {
            out.push_str(" [disabled]");
        }
        out
    }
}

/// Collect all elements matching the semantic role set from a raw
/// `Accessibility.getFullAXTree` response, in document order. An optional
/// filter keeps only elements whose accessible name contains the given text
/// (case-insensitive). All matches are returned; callers must tolerate
/// unbounded result sizes.
pub fn collect_semantic(tree: &Value, text_filter: Option<&str>) -> Vec<AxElement> {
    let nodes = match tree.get("nodes").and_then(|v| v.as_array()) {
        Some(arr) => arr,
        None => return Vec::new(),
    };

    let filter_lower = text_filter.map(|t| t.to_lowercase());

    nodes
        .iter()
        .filter(|node| {
            !node
                .get("ignored")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
        })
        .filter_map(|node| {
            let role = ax_value(node, "role");
            if !SEMANTIC_ROLES
                .iter()
                .any(|r| r.eq_ignore_ascii_case(&role))
            {
                return None;
            }

            let name = ax_value(node, "name");
            if let Some(ref needle) = filter_lower {
                if !name.to_lowercase().contains(needle.as_str()) {
                    return None;
                }
            }

            Some(AxElement {
                role: role.to_lowercase(),
                name,
                disabled: node_property_bool(node, "disabled"),
            })
        })
        .collect()
}

/// CDP wraps role/name/value as `{type: "...", value: "..."}`.
fn ax_value(node: &Value, field: &str) -> String {
    node.get(field)
        .and_then(|v| v.get("value").and_then(|val| val.as_str()).or_else(|| v.as_str()))
        .unwrap_or("")
        .to_string()
}

fn node_property_bool(node: &Value, property: &str) -> bool {
    node.get("properties")
        .and_then(|v| v.as_array())
        .map(|props| {
            props.iter().any(|prop| {
                prop.get("name").and_then(|v| v.as_str()) == Some(property)
                    && prop
                        .get("value")
                        .and_then(|v| v.get("value"))
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}
