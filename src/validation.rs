//! Config validation against a [`Schema`].
//!
//! Runs before any resource-specific checks and before any network call.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_singlestore::schema::{Attribute, Schema};
//! use hemmer_provider_singlestore::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("member_users", Attribute::optional_string_list());
//!
//! assert!(validate(&schema, &json!({"name": "admins"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "admins", "member_users": "bob"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("member_users".to_string()));
//! ```

use serde_json::Value;
use std::collections::BTreeMap;

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};

/// Validate a configuration object against a schema.
///
/// Returns one diagnostic per problem; an empty list means the value is valid.
///
/// - Required attributes must be present and non-null.
/// - Computed-only attributes must not be configured.
/// - Attributes not in the schema are rejected.
/// - Types must match, recursively for lists, sets and objects.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            for (name, attr) in &schema.block.attributes {
                validate_attribute(attr, None, name, &mut diagnostics);
            }
            return diagnostics;
        },
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object").with_detail(format!(
                    "Got {}",
                    value_type_name(other)
                )),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    for (name, value) in obj {
        if !schema.block.attributes.contains_key(name) && !value.is_null() {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("This attribute is not defined in the schema")
                    .with_attribute(name.clone()),
            );
        }
    }

    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(_) if attr.flags.is_computed_only() => {
            diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' is read-only", path))
                    .with_detail("This attribute is set by the provider and cannot be configured")
                    .with_attribute(path),
            );
        },
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            let Some(arr) = value.as_array() else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) {
                    "set"
                } else {
                    "list"
                };
                diagnostics.push(type_error(path, expected, value));
                return;
            };
            for (i, elem) in arr.iter().enumerate() {
                validate_type(element_type, elem, &format!("{}.{}", path, i), diagnostics);
            }
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
    }
}

fn validate_object(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Object members carry no presence flags; only types are checked.
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_type(attr_type, value, &format!("{}.{}", path, name), diagnostics);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64()
                || n
                    .as_f64()
                    .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                    .unwrap_or(false)
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("member_users", Attribute::optional_string_list())
    }

    #[test]
    fn test_required_attribute() {
        let schema = team_schema();

        assert!(validate(&schema, &json!({"name": "admins"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &Value::Null);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_wrong_types() {
        let schema = team_schema();

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));

        let diagnostics = validate(&schema, &json!({"name": "a", "member_users": ["x", 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("member_users.1"));
    }

    #[test]
    fn test_computed_only_attribute_cannot_be_configured() {
        let schema = team_schema();

        assert!(validate(&schema, &json!({"name": "a", "id": null})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "a", "id": "abc"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("read-only"));
    }

    #[test]
    fn test_unknown_attribute() {
        let schema = team_schema();
        let diagnostics = validate(&schema, &json!({"name": "a", "colour": "red"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("colour"));
    }

    #[test]
    fn test_int64_accepts_integral_floats() {
        let schema = Schema::v0().with_attribute("poll_interval", Attribute::optional_int64());
        assert!(validate(&schema, &json!({"poll_interval": 5})).is_empty());
        assert!(validate(&schema, &json!({"poll_interval": 5.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"poll_interval": 5.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"poll_interval": "5"})).len(), 1);
    }

    #[test]
    fn test_object_members_typed() {
        let schema = Schema::v0().with_attribute(
            "region",
            Attribute::new(
                AttributeType::object([("id", AttributeType::String)]),
                crate::schema::AttributeFlags::optional(),
            ),
        );
        assert!(validate(&schema, &json!({"region": {"id": "r"}})).is_empty());
        let diagnostics = validate(&schema, &json!({"region": {"id": 3}}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("region.id"));
    }
}
