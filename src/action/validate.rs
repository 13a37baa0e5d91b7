//! Schema validation of raw parameter maps into [`RequestObject`]s.
//!
//! Unknown keys are ignored. When a field is supplied under both its name and
//! its alias, the alias wins. A JSON `null` counts as absent.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{ActionDescriptor, FieldDefault, FieldDescriptor, FieldKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i32),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Int(v) => Value::from(*v),
            FieldValue::Bool(v) => Value::Bool(*v),
            FieldValue::Text(v) => Value::String(v.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

fn default_value(default: FieldDefault) -> Option<FieldValue> {
    match default {
        FieldDefault::Required => None,
        FieldDefault::Int(v) => Some(FieldValue::Int(v)),
        FieldDefault::Bool(v) => Some(FieldValue::Bool(v)),
        FieldDefault::Str(v) => Some(FieldValue::Text(v.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("field '{field}' is required")]
    MissingField { field: &'static str },

    #[error("field '{field}' expected {expected}, got {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("field '{field}' must be one of [{}], got '{value}'", allowed.join(", "))]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::TypeMismatch { field, .. }
            | ValidationError::InvalidEnum { field, .. } => field,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::TypeMismatch { .. } => "type_mismatch",
            ValidationError::InvalidEnum { .. } => "invalid_enum",
        }
    }
}

/// Every field-level problem found in one parameter map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// Validated, immutable parameters for one action. Every descriptor field
/// holds a value, either supplied or defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestObject {
    descriptor: &'static ActionDescriptor,
    values: Vec<FieldValue>,
}

impl RequestObject {
    pub fn action(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn descriptor(&self) -> &'static ActionDescriptor {
        self.descriptor
    }

    /// Value by canonical name or alias.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.descriptor
            .fields
            .iter()
            .position(|f| f.matches(key))
            .and_then(|i| self.values.get(i))
    }

    pub fn int(&self, key: &'static str) -> Result<i32, ValidationError> {
        self.typed(key, FieldValue::as_int, "integer")
    }

    pub fn bool(&self, key: &'static str) -> Result<bool, ValidationError> {
        self.typed(key, FieldValue::as_bool, "boolean")
    }

    pub fn text(&self, key: &'static str) -> Result<&str, ValidationError> {
        match self.get(key) {
            Some(FieldValue::Text(v)) => Ok(v),
            Some(other) => Err(mismatch(key, "string", &other.to_json())),
            None => Err(ValidationError::MissingField { field: key }),
        }
    }

    fn typed<T>(
        &self,
        key: &'static str,
        read: impl Fn(&FieldValue) -> Option<T>,
        expected: &'static str,
    ) -> Result<T, ValidationError> {
        let value = self.get(key).ok_or(ValidationError::MissingField { field: key })?;
        read(value).ok_or_else(|| mismatch(key, expected, &value.to_json()))
    }

    /// Copy with some fields replaced, re-validated against the same action.
    pub fn with_overrides(&self, overrides: &Map<String, Value>) -> Result<RequestObject, ValidationFailure> {
        self.reshape(self.descriptor, overrides)
    }

    /// Copy onto another action's schema. Fields sharing a canonical name
    /// carry over, `overrides` are applied on top, the rest default.
    pub fn reshape(
        &self,
        target: &'static ActionDescriptor,
        overrides: &Map<String, Value>,
    ) -> Result<RequestObject, ValidationFailure> {
        let mut params = self.to_params();
        for (key, value) in overrides {
            let key = target.field(key).map(|f| f.name.to_string()).unwrap_or_else(|| key.clone());
            params.insert(key, value.clone());
        }
        validate(target, &params)
    }

    /// Parameters keyed by canonical field name.
    pub fn to_params(&self) -> Map<String, Value> {
        self.descriptor
            .fields
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.name.to_string(), v.to_json()))
            .collect()
    }

    /// Parameters keyed by wire alias.
    pub fn to_wire_params(&self) -> Map<String, Value> {
        self.descriptor
            .fields
            .iter()
            .zip(&self.values)
            .map(|(f, v)| (f.alias.to_string(), v.to_json()))
            .collect()
    }
}

/// Validate `params` against `descriptor`, collecting every field error.
pub fn validate(
    descriptor: &'static ActionDescriptor,
    params: &Map<String, Value>,
) -> Result<RequestObject, ValidationFailure> {
    let mut values = Vec::with_capacity(descriptor.fields.len());
    let mut errors = Vec::new();

    for field in descriptor.fields {
        let supplied = params
            .get(field.alias)
            .or_else(|| params.get(field.name))
            .filter(|v| !v.is_null());

        let result = match supplied {
            Some(raw) => coerce(field, raw),
            None => default_value(field.default).ok_or(ValidationError::MissingField { field: field.name }),
        };
        match result {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(RequestObject { descriptor, values })
    } else {
        Err(ValidationFailure { errors })
    }
}

fn coerce(field: &FieldDescriptor, raw: &Value) -> Result<FieldValue, ValidationError> {
    match field.kind {
        FieldKind::Integer => coerce_int(raw)
            .map(FieldValue::Int)
            .ok_or_else(|| mismatch(field.name, "integer", raw)),
        FieldKind::Boolean => coerce_bool(raw)
            .map(FieldValue::Bool)
            .ok_or_else(|| mismatch(field.name, "boolean", raw)),
        FieldKind::Text => raw
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(|| mismatch(field.name, "string", raw)),
        FieldKind::Enum(allowed) => {
            let value = raw
                .as_str()
                .ok_or_else(|| mismatch(field.name, "string", raw))?;
            if allowed.contains(&value) {
                Ok(FieldValue::Text(value.to_string()))
            } else {
                Err(ValidationError::InvalidEnum {
                    field: field.name,
                    value: value.to_string(),
                    allowed,
                })
            }
        }
    }
}

/// Integers, integral floats and numeric strings within `i32`.
fn coerce_int(raw: &Value) -> Option<i32> {
    match raw {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                i32::try_from(v).ok()
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) {
                    Some(f as i32)
                } else {
                    None
                }
            }
        }
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "on" => Some(true),
            "false" | "0" | "no" | "n" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn mismatch(field: &'static str, expected: &'static str, raw: &Value) -> ValidationError {
    let found = match raw {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    ValidationError::TypeMismatch {
        field,
        expected,
        found: found.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::schema::Registry;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn descriptor(name: &str) -> &'static ActionDescriptor {
        Registry::global().lookup(name).unwrap()
    }

    #[test]
    fn alias_and_canonical_inputs_are_equal() {
        let d = descriptor("move_mouse");
        let a = validate(d, &params(json!({"x": 10, "y": 20}))).unwrap();
        let b = validate(d, &params(json!({"PositionX": 10, "PositionY": 20}))).unwrap();
        let c = validate(d, &params(json!({"PositionX": 10, "y": 20}))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let req = validate(descriptor("click_mouse"), &Map::new()).unwrap();
        assert_eq!(req.int("x").unwrap(), 0);
        assert_eq!(req.int("y").unwrap(), 0);
        assert_eq!(req.text("button").unwrap(), "left");
        assert!(!req.bool("press").unwrap());
        assert!(!req.bool("release").unwrap());

        let scroll = validate(descriptor("scroll"), &Map::new()).unwrap();
        assert_eq!(scroll.text("scroll_direction").unwrap(), "up");
        assert_eq!(scroll.int("Amount").unwrap(), 1);
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let err = validate(descriptor("drag_mouse"), &params(json!({"source_x": 1}))).unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["source_y", "target_x", "target_y"]);
        assert!(err.errors.iter().all(|e| e.code() == "missing_field"));
    }

    #[test]
    fn validate_rejects_type_mismatch_with_field_and_type() {
        let err = validate(descriptor("move_mouse"), &params(json!({"x": "left", "y": 1}))).unwrap_err();
        assert_eq!(
            err.errors,
            vec![ValidationError::TypeMismatch {
                field: "x",
                expected: "integer",
                found: "string".into(),
            }]
        );
        assert_eq!(err.to_string(), "field 'x' expected integer, got string");
    }

    #[test]
    fn validate_rejects_values_outside_enum() {
        let err = validate(descriptor("press_mouse"), &params(json!({"button": "double_click"}))).unwrap_err();
        assert_eq!(err.errors[0].code(), "invalid_enum");

        let err = validate(descriptor("scroll"), &params(json!({"Direction": "sideways"}))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'scroll_direction' must be one of [up, down, left, right], got 'sideways'"
        );
    }

    #[test]
    fn lax_coercion_for_numbers_and_booleans() {
        let req = validate(descriptor("move_mouse"), &params(json!({"x": "15", "y": 30.0}))).unwrap();
        assert_eq!(req.int("x").unwrap(), 15);
        assert_eq!(req.int("y").unwrap(), 30);

        let req = validate(descriptor("click_mouse"), &params(json!({"press": "true", "release": 0}))).unwrap();
        assert!(req.bool("press").unwrap());
        assert!(!req.bool("release").unwrap());

        assert!(validate(descriptor("move_mouse"), &params(json!({"x": 1.5, "y": 0}))).is_err());
        assert!(validate(descriptor("move_mouse"), &params(json!({"x": 3_000_000_000i64, "y": 0}))).is_err());
    }

    #[test]
    fn unknown_fields_are_ignored_and_null_is_absent() {
        let req = validate(
            descriptor("scroll"),
            &params(json!({"endpoint": "http://x", "scroll_amount": null})),
        )
        .unwrap();
        assert_eq!(req.int("scroll_amount").unwrap(), 1);
    }

    #[test]
    fn alias_wins_over_canonical_name() {
        let req = validate(descriptor("type_text"), &params(json!({"text": "a", "Text": "b"}))).unwrap();
        assert_eq!(req.text("text").unwrap(), "b");
    }

    #[test]
    fn with_overrides_revalidates() {
        let req = validate(descriptor("click_mouse"), &params(json!({"x": 5, "y": 6}))).unwrap();
        let right = req.with_overrides(&params(json!({"Button": "right"}))).unwrap();
        assert_eq!(right.text("button").unwrap(), "right");
        assert_eq!(right.int("x").unwrap(), 5);
        assert_eq!(req.text("button").unwrap(), "left");

        assert!(req.with_overrides(&params(json!({"button": "fourth"}))).is_err());
    }

    #[test]
    fn reshape_carries_shared_fields() {
        let click = validate(descriptor("click_mouse"), &params(json!({"x": 7, "y": 8, "press": true}))).unwrap();
        let press = click
            .reshape(descriptor("press_mouse"), &params(json!({"button": "middle"})))
            .unwrap();
        assert_eq!(press.action(), "press_mouse");
        assert_eq!(press.to_wire_params(), params(json!({"PositionX": 7, "PositionY": 8, "Button": "middle"})));
    }
}
