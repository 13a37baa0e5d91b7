//! Tool definitions derived from the action registry.

use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::{json, Value};

use crate::action::{ActionDescriptor, Registry};

/// Per-call tool server override, accepted in remote mode only.
pub const ENDPOINT_PARAM: &str = "endpoint";

/// One tool per registered action, named by its canonical id.
pub fn build_tools(registry: &Registry, remote: bool) -> Vec<Tool> {
    registry
        .actions()
        .iter()
        .map(|descriptor| tool_for(descriptor, remote))
        .collect()
}

fn tool_for(descriptor: &ActionDescriptor, remote: bool) -> Tool {
    let mut schema: JsonObject = descriptor.input_schema();
    if remote {
        if let Some(Value::Object(properties)) = schema.get_mut("properties") {
            properties.insert(
                ENDPOINT_PARAM.to_string(),
                json!({
                    "type": "string",
                    "description": "Tool server base URL; defaults to the configured remote endpoint",
                }),
            );
        }
    }
    Tool::new(descriptor.name, descriptor.description, Arc::new(schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tool_per_action() {
        let tools = build_tools(Registry::global(), false);
        assert_eq!(tools.len(), 12);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert!(names.contains(&"drag_mouse"));
        assert!(names.contains(&"take_screenshot"));
    }

    #[test]
    fn schema_lists_required_fields() {
        let tools = build_tools(Registry::global(), false);
        let move_mouse = tools.iter().find(|t| t.name == "move_mouse").unwrap();
        assert_eq!(move_mouse.input_schema["type"], "object");
        assert_eq!(move_mouse.input_schema["required"], json!(["x", "y"]));
        assert!(move_mouse.input_schema["properties"].get(ENDPOINT_PARAM).is_none());
    }

    #[test]
    fn remote_tools_accept_endpoint() {
        let tools = build_tools(Registry::global(), true);
        for tool in &tools {
            assert_eq!(tool.input_schema["properties"][ENDPOINT_PARAM]["type"], "string");
        }
    }
}
