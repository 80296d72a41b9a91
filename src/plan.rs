//! Schema-driven planning.
//!
//! Every resource plans the same way: configurable attributes are compared by
//! value, computed-only attributes are carried over from prior state (or left
//! unknown on create), and a change to a `force_new` attribute turns the
//! update into a replacement.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a resource change from its schema.
///
/// - `prior == None` plans a create.
/// - `proposed == Null` plans a delete.
/// - Otherwise plans an in-place update or a replacement.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    match (prior, proposed) {
        (Some(prior), Value::Null) => plan_delete(prior),
        (None, proposed) => plan_create(schema, proposed),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

fn plan_delete(prior: &Value) -> PlanResult {
    let changes = prior
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let proposed = object_of(proposed);
    let mut planned = Map::new();
    let mut changes = Vec::new();

    for (name, attr) in &schema.block.attributes {
        let value = configured_value(attr, proposed.get(name));
        if !value.is_null() {
            changes.push(AttributeChange::added(name.clone(), value.clone()));
        }
        planned.insert(name.clone(), value);
    }

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let prior = object_of(prior);
    let proposed = object_of(proposed);
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.block.attributes {
        let before = prior.get(name).cloned().unwrap_or(Value::Null);

        if attr.flags.is_computed_only() {
            planned.insert(name.clone(), before);
            continue;
        }

        let mut after = configured_value(attr, proposed.get(name));
        // Optional+computed attributes left unset keep whatever the API chose.
        if after.is_null() && attr.flags.computed {
            after = before.clone();
        }

        if !values_equal(&attr.attr_type, &before, &after) {
            requires_replace |= attr.force_new;
            changes.push(match (before.is_null(), after.is_null()) {
                (true, _) => AttributeChange::added(name.clone(), after.clone()),
                (false, true) => AttributeChange::removed(name.clone(), before.clone()),
                (false, false) => AttributeChange::modified(name.clone(), before.clone(), after.clone()),
            });
        } else {
            // Keep the prior spelling so equal-as-set lists do not churn.
            after = before;
        }
        planned.insert(name.clone(), after);
    }

    if requires_replace {
        // A replacement recreates the object, so computed values become unknown.
        for (name, attr) in &schema.block.attributes {
            if attr.flags.is_computed_only() {
                planned.insert(name.clone(), Value::Null);
            }
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn object_of(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn configured_value(attr: &Attribute, value: Option<&Value>) -> Value {
    if attr.flags.is_computed_only() {
        return Value::Null;
    }
    match value {
        Some(v) if !v.is_null() => v.clone(),
        _ => attr.default.clone().unwrap_or(Value::Null),
    }
}

/// Compare two attribute values; sets compare without regard to order.
pub fn values_equal(attr_type: &AttributeType, a: &Value, b: &Value) -> bool {
    match (attr_type, a, b) {
        (AttributeType::Set(_), Value::Array(x), Value::Array(y)) => {
            element_keys(x) == element_keys(y)
        },
        // An empty collection and an unset one mean the same thing.
        (AttributeType::Set(_) | AttributeType::List(_), Value::Array(x), Value::Null)
        | (AttributeType::Set(_) | AttributeType::List(_), Value::Null, Value::Array(x)) => {
            x.is_empty()
        },
        // So do an empty string and an unset one.
        (AttributeType::String, Value::String(s), Value::Null)
        | (AttributeType::String, Value::Null, Value::String(s)) => s.is_empty(),
        _ => a == b,
    }
}

/// Set elements keyed by their JSON text, since `Value` is not `Hash`.
fn element_keys(values: &[Value]) -> HashSet<String> {
    values.iter().map(Value::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("region_id", Attribute::required_string().with_force_new())
            .with_attribute("members", Attribute::optional_string_set())
            .with_attribute(
                "suspended",
                Attribute::optional_bool().with_default(json!(false)),
            )
    }

    #[test]
    fn test_plan_create_leaves_computed_unknown() {
        let plan = plan_resource(
            &schema(),
            None,
            &json!({"name": "g", "region_id": "r1", "id": "ignored"}),
        );

        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["suspended"], json!(false));
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "region_id", "suspended"]);
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_update_in_place() {
        let prior = json!({
            "id": "abc", "created_at": "t0", "name": "old", "region_id": "r1",
            "members": ["a", "b"], "suspended": false,
        });
        let proposed = json!({"name": "new", "region_id": "r1", "members": ["b", "a"]});

        let plan = plan_resource(&schema(), Some(&prior), &proposed);

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "name");
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], "abc");
        assert_eq!(plan.planned_state["members"], json!(["a", "b"]));
    }

    #[test]
    fn test_plan_force_new_replaces() {
        let prior = json!({"id": "abc", "name": "g", "region_id": "r1", "suspended": false});
        let proposed = json!({"name": "g", "region_id": "r2"});

        let plan = plan_resource(&schema(), Some(&prior), &proposed);

        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_no_change() {
        let prior = json!({
            "id": "abc", "created_at": "t0", "name": "g", "region_id": "r1",
            "members": [], "suspended": false,
        });
        let proposed = json!({"name": "g", "region_id": "r1"});

        let plan = plan_resource(&schema(), Some(&prior), &proposed);
        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state, prior);
    }

    #[test]
    fn test_plan_delete() {
        let prior = json!({"id": "abc", "name": "g", "members": null});
        let plan = plan_resource(&schema(), Some(&prior), &Value::Null);
        assert_eq!(plan.planned_state, Value::Null);
        assert_eq!(plan.changes.len(), 2);
    }

    #[test]
    fn test_values_equal() {
        let set = AttributeType::set(AttributeType::String);
        let list = AttributeType::list(AttributeType::String);
        assert!(values_equal(&set, &json!(["a", "b"]), &json!(["b", "a"])));
        assert!(!values_equal(&list, &json!(["a", "b"]), &json!(["b", "a"])));
        assert!(values_equal(&list, &json!([]), &Value::Null));
        assert!(!values_equal(&set, &json!(["a"]), &Value::Null));
        assert!(values_equal(&set, &json!(["a", "a", "b"]), &json!(["b", "a"])));
        assert!(!values_equal(&set, &json!(["a", "b"]), &json!(["a", "c"])));

        assert!(values_equal(&AttributeType::String, &json!(""), &Value::Null));
        assert!(!values_equal(&AttributeType::String, &json!("x"), &Value::Null));
        assert!(!values_equal(&AttributeType::String, &json!(""), &json!("x")));
    }

    #[test]
    fn test_plan_empty_string_matches_unset() {
        let schema = schema().with_attribute("description", Attribute::optional_string());
        let prior = json!({
            "id": "abc", "created_at": "t0", "name": "g", "region_id": "r1",
            "members": [], "suspended": false, "description": null,
        });
        let proposed = json!({"name": "g", "region_id": "r1", "description": ""});

        let plan = plan_resource(&schema, Some(&prior), &proposed);
        assert!(!plan.has_changes(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state["description"], Value::Null);
    }
}
