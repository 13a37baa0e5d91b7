//! Per-action field descriptors and the process-wide registry.
//!
//! The registry is a static table, so lookups never lock. Each field has a
//! canonical snake_case name and a PascalCase wire alias; both are accepted
//! on input.

use serde_json::{json, Map, Value};

use super::naming::{to_wire_alias, WireStyle};
use crate::error::DispatchError;

pub const MOUSE_BUTTONS: &[&str] = &["left", "right", "middle"];
pub const CLICK_BUTTONS: &[&str] = &["left", "right", "middle", "double_click", "double_left"];
pub const SCROLL_DIRECTIONS: &[&str] = &["up", "down", "left", "right"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Signed 32-bit integer.
    Integer,
    Boolean,
    Text,
    /// Closed string set.
    Enum(&'static [&'static str]),
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Text | FieldKind::Enum(_) => "string",
        }
    }
}

/// A required field never has a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Required,
    Int(i32),
    Bool(bool),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub alias: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    pub description: &'static str,
}

impl FieldDescriptor {
    const fn new(
        name: &'static str,
        alias: &'static str,
        kind: FieldKind,
        default: FieldDefault,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            alias,
            kind,
            default,
            description,
        }
    }

    pub fn required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }

    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.alias == key
    }

    /// JSON Schema fragment for this field.
    pub fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.kind.type_name()));
        schema.insert("description".into(), json!(self.description));
        if let FieldKind::Enum(allowed) = self.kind {
            schema.insert("enum".into(), json!(allowed));
        }
        match self.default {
            FieldDefault::Required => {}
            FieldDefault::Int(v) => {
                schema.insert("default".into(), json!(v));
            }
            FieldDefault::Bool(v) => {
                schema.insert("default".into(), json!(v));
            }
            FieldDefault::Str(v) => {
                schema.insert("default".into(), json!(v));
            }
        }
        Value::Object(schema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldDescriptor],
}

impl ActionDescriptor {
    /// Field by canonical name or alias.
    pub fn field(&self, key: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.matches(key))
    }

    pub fn wire_name(&self) -> String {
        to_wire_alias(self.name, WireStyle::Pascal)
    }

    /// JSON Schema object describing the accepted parameters, keyed by
    /// canonical field name.
    pub fn input_schema(&self) -> Map<String, Value> {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required())
            .map(|f| f.name)
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        schema
    }
}

const fn coord(name: &'static str, alias: &'static str, default: FieldDefault, description: &'static str) -> FieldDescriptor {
    FieldDescriptor::new(name, alias, FieldKind::Integer, default, description)
}

const OPTIONAL_X: FieldDescriptor = coord("x", "PositionX", FieldDefault::Int(0), "X coordinate (horizontal position)");
const OPTIONAL_Y: FieldDescriptor = coord("y", "PositionY", FieldDefault::Int(0), "Y coordinate (vertical position)");
const REQUIRED_X: FieldDescriptor = coord("x", "PositionX", FieldDefault::Required, "X coordinate (horizontal position)");
const REQUIRED_Y: FieldDescriptor = coord("y", "PositionY", FieldDefault::Required, "Y coordinate (vertical position)");

const HELD_BUTTON: FieldDescriptor = FieldDescriptor::new(
    "button",
    "Button",
    FieldKind::Enum(MOUSE_BUTTONS),
    FieldDefault::Str("left"),
    "Mouse button",
);

static ACTIONS: &[ActionDescriptor] = &[
    ActionDescriptor {
        name: "move_mouse",
        description: "Move the mouse to the specified position",
        fields: &[REQUIRED_X, REQUIRED_Y],
    },
    ActionDescriptor {
        name: "click_mouse",
        description: "Click the mouse at the specified position",
        fields: &[
            OPTIONAL_X,
            OPTIONAL_Y,
            FieldDescriptor::new(
                "button",
                "Button",
                FieldKind::Enum(CLICK_BUTTONS),
                FieldDefault::Str("left"),
                "Mouse button to click",
            ),
            FieldDescriptor::new(
                "press",
                "Press",
                FieldKind::Boolean,
                FieldDefault::Bool(false),
                "Only press the button down",
            ),
            FieldDescriptor::new(
                "release",
                "Release",
                FieldKind::Boolean,
                FieldDefault::Bool(false),
                "Only release the button",
            ),
        ],
    },
    ActionDescriptor {
        name: "press_mouse",
        description: "Press the mouse button at the specified position",
        fields: &[OPTIONAL_X, OPTIONAL_Y, HELD_BUTTON],
    },
    ActionDescriptor {
        name: "release_mouse",
        description: "Release the mouse button at the specified position",
        fields: &[OPTIONAL_X, OPTIONAL_Y, HELD_BUTTON],
    },
    ActionDescriptor {
        name: "drag_mouse",
        description: "Drag the mouse from source to target position",
        fields: &[
            coord("source_x", "SourceX", FieldDefault::Required, "Source X coordinate"),
            coord("source_y", "SourceY", FieldDefault::Required, "Source Y coordinate"),
            coord("target_x", "TargetX", FieldDefault::Required, "Target X coordinate"),
            coord("target_y", "TargetY", FieldDefault::Required, "Target Y coordinate"),
        ],
    },
    ActionDescriptor {
        name: "scroll",
        description: "Scroll at the specified position",
        fields: &[
            OPTIONAL_X,
            OPTIONAL_Y,
            FieldDescriptor::new(
                "scroll_direction",
                "Direction",
                FieldKind::Enum(SCROLL_DIRECTIONS),
                FieldDefault::Str("up"),
                "Scroll direction",
            ),
            FieldDescriptor::new(
                "scroll_amount",
                "Amount",
                FieldKind::Integer,
                FieldDefault::Int(1),
                "Number of scroll steps",
            ),
        ],
    },
    ActionDescriptor {
        name: "press_key",
        description: "Press the specified key or key combination (e.g. \"ctrl c\")",
        fields: &[FieldDescriptor::new(
            "key",
            "Key",
            FieldKind::Text,
            FieldDefault::Required,
            "Key or space separated key combination to press",
        )],
    },
    ActionDescriptor {
        name: "type_text",
        description: "Type the specified text",
        fields: &[FieldDescriptor::new(
            "text",
            "Text",
            FieldKind::Text,
            FieldDefault::Required,
            "Text to type",
        )],
    },
    ActionDescriptor {
        name: "wait",
        description: "Wait for the specified duration in milliseconds",
        fields: &[FieldDescriptor::new(
            "duration",
            "Duration",
            FieldKind::Integer,
            FieldDefault::Required,
            "Duration to wait in milliseconds",
        )],
    },
    ActionDescriptor {
        name: "take_screenshot",
        description: "Take a screenshot of the entire screen",
        fields: &[],
    },
    ActionDescriptor {
        name: "get_cursor_position",
        description: "Get the current cursor position",
        fields: &[],
    },
    ActionDescriptor {
        name: "get_screen_size",
        description: "Get the screen dimensions",
        fields: &[],
    },
];

static REGISTRY: Registry = Registry { actions: ACTIONS };

/// Ordered action table.
#[derive(Debug)]
pub struct Registry {
    actions: &'static [ActionDescriptor],
}

impl Registry {
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    /// Exact, case-sensitive lookup by canonical name.
    pub fn lookup(&self, canonical: &str) -> Result<&'static ActionDescriptor, DispatchError> {
        self.actions
            .iter()
            .find(|a| a.name == canonical)
            .ok_or_else(|| DispatchError::not_found(canonical))
    }

    pub fn actions(&self) -> &'static [ActionDescriptor] {
        self.actions
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        self.actions.iter().map(|a| a.name)
    }
}
