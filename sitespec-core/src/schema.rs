//! Prop Schemas - Declarative Section Contracts
//!
//! One schema per section kind. The validator checks against it, the
//! normalizer clamps against it.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::validation::{IssueKind, ValidationIssue};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    Text { max_len: usize },
    Link,
    Email,
    Bool,
    TextList { max_items: usize, max_len: usize },
    ObjectList { max_items: usize, fields: &'static [FieldSpec] },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self { name, required: true, ty }
    }

    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self { name, required: false, ty }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropSchema {
    pub fields: &'static [FieldSpec],
}

impl PropSchema {
    /// Collect every issue in `props`. Unknown fields are ignored.
    pub fn check(&self, props: &Map<String, Value>, path: &str, issues: &mut Vec<ValidationIssue>) {
        check_fields(self.fields, props, path, issues);
    }

    /// Trim and truncate to declared limits, dropping undeclared fields.
    pub fn clamp(&self, props: &Map<String, Value>) -> Map<String, Value> {
        clamp_fields(self.fields, props)
    }
}

fn check_fields(
    fields: &[FieldSpec],
    props: &Map<String, Value>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    for field in fields {
        let field_path = format!("{}.{}", path, field.name);
        match props.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    issues.push(ValidationIssue::new(
                        field_path,
                        IssueKind::MissingField,
                        format!("required field '{}' is missing", field.name),
                    ));
                }
            }
            Some(value) => check_value(field, value, &field_path, issues),
        }
    }
}

fn check_value(field: &FieldSpec, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    match field.ty {
        FieldType::Text { .. } => match value.as_str() {
            None => issues.push(mismatch(path, "a string", value)),
            Some(s) if field.required && s.trim().is_empty() => {
                issues.push(ValidationIssue::new(
                    path,
                    IssueKind::ConstraintViolation,
                    "must not be blank",
                ));
            }
            Some(_) => {}
        },
        FieldType::Link => match value.as_str() {
            None => issues.push(mismatch(path, "a link string", value)),
            Some(s) => {
                if let Some(reason) = link_problem(s) {
                    issues.push(ValidationIssue::new(path, IssueKind::ConstraintViolation, reason));
                }
            }
        },
        FieldType::Email => match value.as_str() {
            None => issues.push(mismatch(path, "an email string", value)),
            Some(s) if !EMAIL.is_match(s.trim()) => {
                issues.push(ValidationIssue::new(
                    path,
                    IssueKind::ConstraintViolation,
                    format!("'{}' is not an email address", s),
                ));
            }
            Some(_) => {}
        },
        FieldType::Bool => {
            if !value.is_boolean() {
                issues.push(mismatch(path, "a boolean", value));
            }
        }
        FieldType::TextList { .. } => match value.as_array() {
            None => issues.push(mismatch(path, "an array of strings", value)),
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    if !item.is_string() {
                        issues.push(mismatch(&format!("{}[{}]", path, i), "a string", item));
                    }
                }
            }
        },
        FieldType::ObjectList { fields, .. } => match value.as_array() {
            None => issues.push(mismatch(path, "an array of objects", value)),
            Some(items) if field.required && items.is_empty() => {
                issues.push(ValidationIssue::new(
                    path,
                    IssueKind::ConstraintViolation,
                    "must contain at least one item",
                ));
            }
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    match item.as_object() {
                        Some(obj) => check_fields(fields, obj, &item_path, issues),
                        None => issues.push(mismatch(&item_path, "an object", item)),
                    }
                }
            }
        },
    }
}

fn link_problem(link: &str) -> Option<String> {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return Some("link must not be empty".to_string());
    }
    let lower = trimmed.to_ascii_lowercase();
    BLOCKED_SCHEMES
        .iter()
        .find(|scheme| lower.starts_with(**scheme))
        .map(|scheme| format!("links using '{}' are not allowed", scheme))
}

fn mismatch(path: &str, expected: &str, actual: &Value) -> ValidationIssue {
    ValidationIssue::new(
        path,
        IssueKind::TypeMismatch,
        format!("expected {}, found {}", expected, json_type(actual)),
    )
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn clamp_fields(fields: &[FieldSpec], props: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for field in fields {
        let Some(value) = props.get(field.name) else { continue };
        if let Some(clamped) = clamp_value(field.ty, value) {
            out.insert(field.name.to_string(), clamped);
        }
    }
    out
}

fn clamp_value(ty: FieldType, value: &Value) -> Option<Value> {
    match (ty, value) {
        (FieldType::Text { max_len }, Value::String(s)) => Some(Value::String(clamp_text(s, max_len))),
        (FieldType::Link, Value::String(s)) | (FieldType::Email, Value::String(s)) => {
            Some(Value::String(s.trim().to_string()))
        }
        (FieldType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (FieldType::TextList { max_items, max_len }, Value::Array(items)) => Some(Value::Array(
            items
                .iter()
                .filter_map(Value::as_str)
                .take(max_items)
                .map(|s| Value::String(clamp_text(s, max_len)))
                .collect(),
        )),
        (FieldType::ObjectList { max_items, fields }, Value::Array(items)) => Some(Value::Array(
            items
                .iter()
                .filter_map(Value::as_object)
                .take(max_items)
                .map(|obj| Value::Object(clamp_fields(fields, obj)))
                .collect(),
        )),
        _ => None,
    }
}

/// Trim, then cut to at most `max_len` characters.
pub fn clamp_text(s: &str, max_len: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_len).collect();
    cut.trim_end().to_string()
}
