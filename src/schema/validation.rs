//! Runtime validation of values against declared schemas.
//!
//! Validation walks the schema and value together, accumulating a context
//! path so failures read like `field "steps": array item 3: expected
//! object, got string`. The first violation found is returned; callers at
//! the unit boundary wrap it into an invalid-input error.
//!
//! Semantics:
//!
//! * `string` enforces length bounds and an optional regex pattern. An
//!   invalid pattern is itself a violation, never a silent match.
//! * `number` accepts any JSON numeric representation; bounds are checked
//!   after coercion to `f64`.
//! * `array` validates every element when an item schema is declared.
//! * `object` is open-world: unknown properties pass, required properties
//!   must be present, declared properties must validate.
//! * `null` input is always invalid.
//! * an `Unknown` type tag is always invalid.

use regex::Regex;
use serde_json::Value;
use std::fmt;

use crate::schema::{Schema, SchemaType};

/// A single validation failure with its location in the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Context frames from the root to the failing location, e.g.
    /// `["field \"steps\"", "array item 3"]`.
    pub path: Vec<String>,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: &[String], reason: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.path {
            write!(f, "{}: ", frame)?;
        }
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

/// Validates `value` against `schema`, returning the first violation found.
pub fn validate(schema: &Schema, value: &Value) -> Result<(), SchemaViolation> {
    let mut path = Vec::new();
    validate_at(schema, value, &mut path)
}

fn validate_at(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    if value.is_null() {
        return Err(SchemaViolation::new(path, "value is required"));
    }

    match schema.schema_type {
        SchemaType::String => validate_string(schema, value, path),
        SchemaType::Number => validate_number(schema, value, path),
        SchemaType::Boolean => validate_boolean(schema, value, path),
        SchemaType::Array => validate_array(schema, value, path),
        SchemaType::Object => validate_object(schema, value, path),
        SchemaType::Unknown => Err(SchemaViolation::new(path, "unknown schema type")),
    }
}

fn validate_string(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    let Some(text) = value.as_str() else {
        return Err(SchemaViolation::new(
            path,
            format!("expected string, got {}", type_name(value)),
        ));
    };

    let length = text.chars().count();
    if let Some(min) = schema.min_length {
        if length < min {
            return Err(SchemaViolation::new(
                path,
                format!("length {} is below minimum length {}", length, min),
            ));
        }
    }
    if let Some(max) = schema.max_length {
        if length > max {
            return Err(SchemaViolation::new(
                path,
                format!("length {} exceeds maximum length {}", length, max),
            ));
        }
    }

    if let Some(pattern) = &schema.pattern {
        let regex = Regex::new(pattern).map_err(|e| {
            SchemaViolation::new(path, format!("invalid pattern '{}': {}", pattern, e))
        })?;
        if !regex.is_match(text) {
            return Err(SchemaViolation::new(
                path,
                format!("value '{}' does not match pattern '{}'", text, pattern),
            ));
        }
    }

    validate_enum(schema, value, path)
}

fn validate_number(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    if !value.is_number() {
        return Err(SchemaViolation::new(
            path,
            format!("expected number, got {}", type_name(value)),
        ));
    }

    // Integers above 2^53 lose precision here; bound checks tolerate it.
    let number = value.as_f64().unwrap_or(f64::NAN);
    if let Some(min) = schema.minimum {
        if number < min {
            return Err(SchemaViolation::new(
                path,
                format!("value {} is below minimum {}", number, min),
            ));
        }
    }
    if let Some(max) = schema.maximum {
        if number > max {
            return Err(SchemaViolation::new(
                path,
                format!("value {} exceeds maximum {}", number, max),
            ));
        }
    }

    validate_enum(schema, value, path)
}

fn validate_boolean(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    if !value.is_boolean() {
        return Err(SchemaViolation::new(
            path,
            format!("expected boolean, got {}", type_name(value)),
        ));
    }
    validate_enum(schema, value, path)
}

fn validate_array(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    let Some(elements) = value.as_array() else {
        return Err(SchemaViolation::new(
            path,
            format!("expected array, got {}", type_name(value)),
        ));
    };

    if let Some(items) = &schema.items {
        for (index, element) in elements.iter().enumerate() {
            path.push(format!("array item {}", index));
            let result = validate_at(items, element, path);
            path.pop();
            result?;
        }
    }

    Ok(())
}

fn validate_object(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    let Some(map) = value.as_object() else {
        return Err(SchemaViolation::new(
            path,
            format!("expected object, got {}", type_name(value)),
        ));
    };

    for name in &schema.required {
        if !map.contains_key(name) {
            return Err(SchemaViolation::new(
                path,
                format!("missing required field \"{}\"", name),
            ));
        }
    }

    // Open-world: properties without a declared field schema are allowed.
    for (name, property) in map {
        if let Some(field) = schema.properties.get(name) {
            path.push(format!("field \"{}\"", name));
            let result = validate_at(&field.schema, property, path);
            path.pop();
            result?;
        }
    }

    Ok(())
}

fn validate_enum(schema: &Schema, value: &Value, path: &mut Vec<String>) -> Result<(), SchemaViolation> {
    if schema.enum_values.is_empty() || schema.enum_values.contains(value) {
        return Ok(());
    }
    Err(SchemaViolation::new(
        path,
        format!(
            "value {} is not one of the allowed values {}",
            value,
            Value::Array(schema.enum_values.clone())
        ),
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
