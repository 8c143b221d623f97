//! Recursive response clean-up passes.

use axl_util::xml::ATTRIBUTES_KEY;
use serde_json::Value;

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Removes `null` fields and containers left empty, children first.
pub fn prune(value: &mut Value) -> &mut Value {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                prune(child);
            }

            map.retain(|_, child| !is_empty(child));
        }

        Value::Array(items) => {
            for item in items.iter_mut() {
                prune(item);
            }

            items.retain(|item| !is_empty(item));
        }

        _ => (),
    }

    value
}

/// Removes every container field from objects that carry attribute metadata.
///
/// Scalar siblings of the marker survive.
pub fn strip_attributes(value: &mut Value) -> &mut Value {
    match value {
        Value::Object(map) => {
            let marked = map.contains_key(ATTRIBUTES_KEY);

            for child in map.values_mut() {
                strip_attributes(child);
            }

            if marked {
                map.retain(|_, child| !(child.is_object() || child.is_array()));
            }
        }

        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_attributes(item);
            }
        }

        _ => (),
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_cascades() {
        let mut value = json!({
            "name": "SEP001122334455",
            "description": null,
            "lines": {"line": [{"index": null}, {"dirn": {"pattern": null}}]},
            "vendorConfig": {},
            "keep": "",
            "counts": [0, null]
        });

        assert_eq!(
            prune(&mut value),
            &json!({"name": "SEP001122334455", "keep": "", "counts": [0]})
        );
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut value = json!({"a": {"b": null, "c": [{}, {"d": 1}]}, "e": []});
        let once = prune(&mut value).clone();

        assert_eq!(once, json!({"a": {"c": [{"d": 1}]}}));
        assert_eq!(prune(&mut value), &once);
    }

    #[test]
    fn test_strip_removes_marked_containers() {
        let mut value = json!({
            "phone": {
                "attributes": {"uuid": "{1234}"},
                "name": "SEP001122334455",
                "devicePoolName": {"attributes": {"uuid": "{5678}"}, "value": "Default"},
                "lines": {"line": [{"index": "1"}]}
            }
        });

        assert_eq!(
            strip_attributes(&mut value),
            &json!({"phone": {"name": "SEP001122334455"}})
        );
    }

    #[test]
    fn test_strip_visits_sequences() {
        let mut value = json!({
            "routePartition": [
                {"attributes": {"uuid": "{1}"}, "name": "PT-1"},
                {"attributes": {"uuid": "{2}"}, "name": "PT-2", "timeScheduleIdName": {"value": "Always"}}
            ]
        });

        strip_attributes(&mut value);

        assert_eq!(
            value,
            json!({"routePartition": [{"name": "PT-1"}, {"name": "PT-2"}]})
        );
    }

    #[test]
    fn test_strip_leaves_unmarked_objects() {
        let mut value = json!({"return": {"phone": {"name": "SEP1", "lines": {"line": {"index": "1"}}}}});
        let expected = value.clone();

        assert_eq!(strip_attributes(&mut value), &expected);
    }
}
