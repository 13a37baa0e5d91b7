//! Action catalogue: naming, schemas, validation and the typed requests the
//! capability layer consumes.

pub mod naming;
pub mod schema;
pub mod validate;

use std::time::Duration;

use serde_json::{Map, Value};

use crate::drag::PathPoint;
use naming::{to_wire_alias, WireStyle};
use validate::{RequestObject, ValidationError, ValidationFailure};

pub use schema::{ActionDescriptor, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickButton {
    Left,
    Right,
    Middle,
    /// Left double click. Accepted under both `double_click` and `double_left`.
    DoubleLeft,
}

impl ClickButton {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "double_click" | "double_left" => Some(ClickButton::DoubleLeft),
            other => MouseButton::parse(other).map(|b| match b {
                MouseButton::Left => ClickButton::Left,
                MouseButton::Right => ClickButton::Right,
                MouseButton::Middle => ClickButton::Middle,
            }),
        }
    }

    pub fn button(&self) -> MouseButton {
        match self {
            ClickButton::Left | ClickButton::DoubleLeft => MouseButton::Left,
            ClickButton::Right => MouseButton::Right,
            ClickButton::Middle => MouseButton::Middle,
        }
    }

    pub fn clicks(&self) -> u32 {
        match self {
            ClickButton::DoubleLeft => 2,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClickButton::DoubleLeft => "double_click",
            other => other.button().as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(ScrollDirection::Up),
            "down" => Some(ScrollDirection::Down),
            "left" => Some(ScrollDirection::Left),
            "right" => Some(ScrollDirection::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
            ScrollDirection::Left => "left",
            ScrollDirection::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveMouse {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickMouse {
    pub x: i32,
    pub y: i32,
    pub button: ClickButton,
}

/// Press or release of a single button at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonAt {
    pub x: i32,
    pub y: i32,
    pub button: MouseButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragMouse {
    pub source: PathPoint,
    pub target: PathPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scroll {
    pub x: i32,
    pub y: i32,
    pub direction: ScrollDirection,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressKey {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeText {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    /// Milliseconds.
    pub duration_ms: i32,
}

impl Wait {
    /// `None` for a negative duration.
    pub fn duration(&self) -> Option<Duration> {
        u64::try_from(self.duration_ms).ok().map(Duration::from_millis)
    }
}

/// A validated action ready for a capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MoveMouse(MoveMouse),
    ClickMouse(ClickMouse),
    PressMouse(ButtonAt),
    ReleaseMouse(ButtonAt),
    DragMouse(DragMouse),
    Scroll(Scroll),
    PressKey(PressKey),
    TypeText(TypeText),
    Wait(Wait),
    TakeScreenshot,
    GetCursorPosition,
    GetScreenSize,
}

impl Action {
    /// Build the typed action. A `click_mouse` that only presses or only
    /// releases becomes `press_mouse` / `release_mouse` with the same
    /// position and the click's underlying button.
    pub fn from_request(request: &RequestObject) -> Result<Self, ValidationFailure> {
        if request.action() == "click_mouse" {
            let press = request.bool("press").map_err(single)?;
            let release = request.bool("release").map_err(single)?;
            if press != release {
                let button = ClickButton::parse(request.text("button").map_err(single)?)
                    .ok_or_else(|| single(enum_error(request, "button")))?;
                let target = if press { "press_mouse" } else { "release_mouse" };
                let descriptor = Registry::global()
                    .lookup(target)
                    .map_err(|_| single(ValidationError::MissingField { field: "button" }))?;
                let mut overrides = Map::new();
                overrides.insert("button".into(), Value::from(button.button().as_str()));
                return Action::from_request(&request.reshape(descriptor, &overrides)?);
            }
        }
        Self::build(request).map_err(single)
    }

    fn build(request: &RequestObject) -> Result<Self, ValidationError> {
        let action = match request.action() {
            "move_mouse" => Action::MoveMouse(MoveMouse {
                x: request.int("x")?,
                y: request.int("y")?,
            }),
            "click_mouse" => Action::ClickMouse(ClickMouse {
                x: request.int("x")?,
                y: request.int("y")?,
                button: ClickButton::parse(request.text("button")?)
                    .ok_or_else(|| enum_error(request, "button"))?,
            }),
            "press_mouse" => Action::PressMouse(button_at(request)?),
            "release_mouse" => Action::ReleaseMouse(button_at(request)?),
            "drag_mouse" => Action::DragMouse(DragMouse {
                source: PathPoint::new(request.int("source_x")?, request.int("source_y")?),
                target: PathPoint::new(request.int("target_x")?, request.int("target_y")?),
            }),
            "scroll" => Action::Scroll(Scroll {
                x: request.int("x")?,
                y: request.int("y")?,
                direction: ScrollDirection::parse(request.text("scroll_direction")?)
                    .ok_or_else(|| enum_error(request, "scroll_direction"))?,
                amount: request.int("scroll_amount")?,
            }),
            "press_key" => Action::PressKey(PressKey {
                key: request.text("key")?.to_string(),
            }),
            "type_text" => Action::TypeText(TypeText {
                text: request.text("text")?.to_string(),
            }),
            "wait" => Action::Wait(Wait {
                duration_ms: request.int("duration")?,
            }),
            "take_screenshot" => Action::TakeScreenshot,
            "get_cursor_position" => Action::GetCursorPosition,
            "get_screen_size" => Action::GetScreenSize,
            other => {
                return Err(ValidationError::InvalidEnum {
                    field: "action",
                    value: other.to_string(),
                    allowed: &[],
                })
            }
        };
        Ok(action)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::MoveMouse(_) => "move_mouse",
            Action::ClickMouse(_) => "click_mouse",
            Action::PressMouse(_) => "press_mouse",
            Action::ReleaseMouse(_) => "release_mouse",
            Action::DragMouse(_) => "drag_mouse",
            Action::Scroll(_) => "scroll",
            Action::PressKey(_) => "press_key",
            Action::TypeText(_) => "type_text",
            Action::Wait(_) => "wait",
            Action::TakeScreenshot => "take_screenshot",
            Action::GetCursorPosition => "get_cursor_position",
            Action::GetScreenSize => "get_screen_size",
        }
    }

    pub fn wire_name(&self) -> String {
        to_wire_alias(self.name(), WireStyle::Pascal)
    }

    /// Parameters keyed by wire alias, as a REST tool server expects them.
    pub fn wire_params(&self) -> Map<String, Value> {
        let pairs: Vec<(&str, Value)> = match self {
            Action::MoveMouse(m) => vec![("x", m.x.into()), ("y", m.y.into())],
            Action::ClickMouse(c) => vec![
                ("x", c.x.into()),
                ("y", c.y.into()),
                ("button", c.button.as_str().into()),
            ],
            Action::PressMouse(b) | Action::ReleaseMouse(b) => vec![
                ("x", b.x.into()),
                ("y", b.y.into()),
                ("button", b.button.as_str().into()),
            ],
            Action::DragMouse(d) => vec![
                ("source_x", d.source.x.into()),
                ("source_y", d.source.y.into()),
                ("target_x", d.target.x.into()),
                ("target_y", d.target.y.into()),
            ],
            Action::Scroll(s) => vec![
                ("x", s.x.into()),
                ("y", s.y.into()),
                ("scroll_direction", s.direction.as_str().into()),
                ("scroll_amount", s.amount.into()),
            ],
            Action::PressKey(k) => vec![("key", k.key.clone().into())],
            Action::TypeText(t) => vec![("text", t.text.clone().into())],
            Action::Wait(w) => vec![("duration", w.duration_ms.into())],
            Action::TakeScreenshot | Action::GetCursorPosition | Action::GetScreenSize => Vec::new(),
        };

        let descriptor = Registry::global().lookup(self.name()).ok();
        pairs
            .into_iter()
            .map(|(name, value)| {
                let alias = descriptor
                    .and_then(|d| d.field(name))
                    .map_or(name, |f| f.alias);
                (alias.to_string(), value)
            })
            .collect()
    }
}

fn button_at(request: &RequestObject) -> Result<ButtonAt, ValidationError> {
    Ok(ButtonAt {
        x: request.int("x")?,
        y: request.int("y")?,
        button: MouseButton::parse(request.text("button")?).ok_or_else(|| enum_error(request, "button"))?,
    })
}

fn enum_error(request: &RequestObject, field: &'static str) -> ValidationError {
    let allowed = match request.descriptor().field(field).map(|f| f.kind) {
        Some(schema::FieldKind::Enum(allowed)) => allowed,
        _ => &[],
    };
    ValidationError::InvalidEnum {
        field,
        value: request.get(field).and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        allowed,
    }
}

fn single(error: ValidationError) -> ValidationFailure {
    ValidationFailure { errors: vec![error] }
}
