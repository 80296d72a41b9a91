//! Conversions between host state objects and Management API values.
//!
//! State arrives as loosely-typed JSON; these helpers pull typed values out of
//! it and turn parse failures into field-scoped [`ProviderError::InvalidAttribute`]
//! errors so the host can point at the offending attribute.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ProviderError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

/// Whether `s` is a syntactically valid email address.
pub fn is_valid_email(s: &str) -> bool {
    s.len() <= 254 && EMAIL_REGEX.is_match(s)
}

/// Validate a single email, scoping the error to `attribute`.
pub fn validate_email(attribute: &str, value: &str) -> Result<(), ProviderError> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(ProviderError::invalid_attribute(
            attribute,
            format!("'{}' is not a valid email address", value),
        ))
    }
}

/// Validate every email in a list. The error names the first bad element.
pub fn validate_emails(attribute: &str, values: &[String]) -> Result<(), ProviderError> {
    for (i, value) in values.iter().enumerate() {
        validate_email(&format!("{}.{}", attribute, i), value)?;
    }
    Ok(())
}

/// Parse a UUID, scoping the error to `attribute`.
pub fn parse_uuid(attribute: &str, value: &str) -> Result<Uuid, ProviderError> {
    Uuid::parse_str(value).map_err(|e| {
        ProviderError::invalid_attribute(attribute, format!("'{}' is not a valid UUID: {}", value, e))
    })
}

/// Parse a list of UUIDs. The error names the first bad element.
pub fn parse_uuids(attribute: &str, values: &[String]) -> Result<Vec<Uuid>, ProviderError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| parse_uuid(&format!("{}.{}", attribute, i), v))
        .collect()
}

/// Render UUIDs in the hyphenated lowercase form the API returns.
pub fn uuids_to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

/// Typed read access to a JSON state object.
///
/// Absent and `null` attributes are treated the same.
#[derive(Debug, Clone, Copy)]
pub struct StateReader<'a> {
    obj: Option<&'a Map<String, Value>>,
}

impl<'a> StateReader<'a> {
    /// Wrap a state value. Non-objects read as empty.
    pub fn new(value: &'a Value) -> Self {
        Self {
            obj: value.as_object(),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.obj.and_then(|o| o.get(name)).filter(|v| !v.is_null())
    }

    /// A required string attribute.
    pub fn string(&self, name: &str) -> Result<String, ProviderError> {
        self.opt_string(name)?.ok_or_else(|| {
            ProviderError::invalid_attribute(name, "attribute is required but was not set")
        })
    }

    /// An optional string attribute.
    pub fn opt_string(&self, name: &str) -> Result<Option<String>, ProviderError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ProviderError::invalid_attribute(name, "expected a string")),
        }
    }

    /// An optional boolean attribute.
    pub fn opt_bool(&self, name: &str) -> Result<Option<bool>, ProviderError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(ProviderError::invalid_attribute(name, "expected a bool")),
        }
    }

    /// An optional int64 attribute.
    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>, ProviderError> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| ProviderError::invalid_attribute(name, "expected an integer")),
        }
    }

    /// A list of strings; absent reads as empty.
    pub fn string_list(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ProviderError::invalid_attribute(
                        format!("{}.{}", name, i),
                        "expected a string",
                    )),
                })
                .collect(),
            Some(_) => Err(ProviderError::invalid_attribute(name, "expected a list")),
        }
    }

    /// A required UUID attribute.
    pub fn uuid(&self, name: &str) -> Result<Uuid, ProviderError> {
        parse_uuid(name, &self.string(name)?)
    }
}

/// Convert an optional string into a JSON value (`null` when absent).
pub fn opt_string_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_validation() {
        for ok in [
            "alice@example.com",
            "bob.smith+ops@sub.example.co.uk",
            "o'brien@example.org",
        ] {
            assert!(is_valid_email(ok), "{} should be valid", ok);
        }
        for bad in [
            "",
            "alice",
            "alice@",
            "@example.com",
            "alice@example",
            "alice example@example.com",
            "alice@-example.com",
        ] {
            assert!(!is_valid_email(bad), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_validate_emails_scopes_to_element() {
        let emails = vec!["a@example.com".to_string(), "nope".to_string()];
        let err = validate_emails("member_users", &emails).unwrap_err();
        assert_eq!(err.attribute(), Some("member_users.1"));
        assert!(err.message().contains("nope"));
    }

    #[test]
    fn test_parse_uuids() {
        let ids = vec![
            "5B0F3C8E-5D1C-4B8A-9E0F-1C2D3E4F5A6B".to_string(),
            "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f".to_string(),
        ];
        let parsed = parse_uuids("member_teams", &ids).unwrap();
        assert_eq!(
            uuids_to_strings(&parsed),
            vec![
                "5b0f3c8e-5d1c-4b8a-9e0f-1c2d3e4f5a6b".to_string(),
                "0e6c0a3c-9d8b-4a5e-8f1e-2a3b4c5d6e7f".to_string(),
            ]
        );

        let err = parse_uuids("member_teams", &["not-a-uuid".to_string()]).unwrap_err();
        assert_eq!(err.attribute(), Some("member_teams.0"));
    }

    #[test]
    fn test_state_reader() {
        let state = json!({
            "name": "admins",
            "description": null,
            "member_users": ["a@example.com"],
            "suspended": true,
            "timeout": 30,
        });
        let r = StateReader::new(&state);

        assert_eq!(r.string("name").unwrap(), "admins");
        assert_eq!(r.opt_string("description").unwrap(), None);
        assert_eq!(r.opt_string("missing").unwrap(), None);
        assert_eq!(r.string_list("member_users").unwrap(), vec!["a@example.com"]);
        assert!(r.string_list("member_teams").unwrap().is_empty());
        assert_eq!(r.opt_bool("suspended").unwrap(), Some(true));
        assert_eq!(r.opt_i64("timeout").unwrap(), Some(30));

        let err = r.string("description").unwrap_err();
        assert_eq!(err.attribute(), Some("description"));
        assert!(r.opt_bool("name").is_err());
    }

    #[test]
    fn test_state_reader_on_null() {
        let r = StateReader::new(&Value::Null);
        assert_eq!(r.opt_string("name").unwrap(), None);
        assert!(r.uuid("id").is_err());
    }
}
