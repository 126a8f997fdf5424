//! Normalises caller-supplied custom field values into the shapes the Jira
//! create endpoint accepts.
//!
//! Values arrive as loose JSON. [`FieldValue::classify`] maps each one onto a
//! recognised shape (first match wins), and [`FieldValue::to_wire`] renders
//! only the keys Jira needs for that shape. Anything unrecognised passes
//! through untouched, so formatting never fails and is idempotent.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

pub const CUSTOM_FIELD_PREFIX: &str = "customfield_";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain string, number or boolean.
    Scalar(Value),
    /// Labels-style list of strings.
    StringList(Vec<Value>),
    /// Select option or any other `{id}` reference.
    IdRef(Value),
    /// Cascading select: parent option plus a nested child option.
    Cascading { id: Value, child: Box<FieldValue> },
    /// User picker keyed by Atlassian account id.
    User { account_id: Value },
    /// Legacy user, version or component referenced only by name.
    Named(Value),
    /// Multi-select of any of the reference shapes above.
    RefList(Vec<FieldValue>),
    Opaque(Value),
}

impl FieldValue {
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => Self::Scalar(value.clone()),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                Self::StringList(items.clone())
            }
            Value::Array(items) if items.iter().all(Value::is_object) => {
                Self::RefList(items.iter().map(Self::classify).collect())
            }
            Value::Object(map) => Self::classify_object(map, value),
            _ => Self::Opaque(value.clone()),
        }
    }

    fn classify_object(map: &Map<String, Value>, original: &Value) -> Self {
        match (
            map.get("id"),
            map.get("child"),
            map.get("accountId"),
            map.get("name"),
        ) {
            (Some(id), None, _, _) => Self::IdRef(id.clone()),
            (Some(id), Some(child), _, _) => Self::Cascading {
                id: id.clone(),
                child: Box::new(Self::classify(child)),
            },
            (None, _, Some(account_id), _) => Self::User {
                account_id: account_id.clone(),
            },
            (None, _, None, Some(name)) => Self::Named(name.clone()),
            _ => Self::Opaque(original.clone()),
        }
    }

    pub fn to_wire(&self) -> Value {
        match self {
            Self::Scalar(v) | Self::Opaque(v) => v.clone(),
            Self::StringList(items) => Value::Array(items.clone()),
            Self::IdRef(id) => json!({ "id": id }),
            Self::Cascading { id, child } => json!({ "id": id, "child": child.to_wire() }),
            Self::User { account_id } => json!({ "accountId": account_id }),
            Self::Named(name) => json!({ "name": name }),
            Self::RefList(items) => Value::Array(items.iter().map(Self::to_wire).collect()),
        }
    }
}

pub fn format(value: &Value) -> Value {
    FieldValue::classify(value).to_wire()
}

fn is_digits(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Resolves a caller key to its wire form: prefixed keys pass through, bare
/// digits gain the `customfield_` prefix, and aliases resolve through
/// `mappings`.
pub fn normalize_field_key(key: &str, mappings: &HashMap<String, String>) -> String {
    if key.starts_with(CUSTOM_FIELD_PREFIX) {
        return key.to_string();
    }
    if is_digits(key) {
        return format!("{CUSTOM_FIELD_PREFIX}{key}");
    }
    match mappings.get(key) {
        Some(target) if is_digits(target) => format!("{CUSTOM_FIELD_PREFIX}{target}"),
        Some(target) => target.clone(),
        None => key.to_string(),
    }
}

/// Normalises keys and formats every custom field value.
pub fn prepare_fields(
    fields: &Map<String, Value>,
    mappings: &HashMap<String, String>,
) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let key = normalize_field_key(key, mappings);
            let value = if key.starts_with(CUSTOM_FIELD_PREFIX) {
                format(value)
            } else {
                value.clone()
            };
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_and_labels_pass_through() {
        assert_eq!(format(&json!("high")), json!("high"));
        assert_eq!(format(&json!(5)), json!(5));
        assert_eq!(format(&json!(true)), json!(true));
        assert_eq!(format(&json!(["db", "oncall"])), json!(["db", "oncall"]));
    }

    #[test]
    fn id_refs_drop_extra_keys() {
        assert_eq!(format(&json!({ "id": "10100" })), json!({ "id": "10100" }));
        assert_eq!(
            format(&json!({ "id": "10100", "value": "Sev 2", "self": "https://x" })),
            json!({ "id": "10100" })
        );
    }

    #[test]
    fn id_is_preferred_over_name() {
        assert_eq!(
            format(&json!({ "name": "v2.0", "id": "10400" })),
            json!({ "id": "10400" })
        );
        assert_eq!(format(&json!({ "name": "v2.0" })), json!({ "name": "v2.0" }));
    }

    #[test]
    fn users_keep_only_account_id() {
        assert_eq!(
            format(&json!({ "accountId": "abc" })),
            json!({ "accountId": "abc" })
        );
        assert_eq!(
            format(&json!({ "accountId": "abc", "name": "jdoe", "displayName": "J" })),
            json!({ "accountId": "abc" })
        );
    }

    #[test]
    fn cascading_select_recurses_into_child() {
        let input = json!({
            "id": "1",
            "value": "Region",
            "child": { "id": "2", "value": "EU" }
        });
        assert_eq!(
            format(&input),
            json!({ "id": "1", "child": { "id": "2" } })
        );
    }

    #[test]
    fn ref_lists_format_each_element() {
        let input = json!([
            { "name": "api", "id": "300" },
            { "name": "web" },
            { "accountId": "abc", "name": "x" }
        ]);
        assert_eq!(
            format(&input),
            json!([{ "id": "300" }, { "name": "web" }, { "accountId": "abc" }])
        );
    }

    #[test]
    fn unknown_shapes_pass_through() {
        assert_eq!(format(&Value::Null), Value::Null);
        assert_eq!(format(&json!({ "value": "x" })), json!({ "value": "x" }));
        assert_eq!(format(&json!(["a", 1])), json!(["a", 1]));
        assert_eq!(
            FieldValue::classify(&json!({ "value": "x" })),
            FieldValue::Opaque(json!({ "value": "x" }))
        );
    }

    #[test]
    fn formatting_is_idempotent() {
        let shapes = [
            json!("text"),
            json!(3.5),
            json!(["a", "b"]),
            json!([]),
            json!({ "id": "1", "extra": true }),
            json!({ "id": "1", "child": { "id": "2", "value": "x" } }),
            json!({ "id": "1", "child": { "value": "x" } }),
            json!({ "accountId": "abc", "active": true }),
            json!({ "name": "jdoe", "key": "jdoe" }),
            json!([{ "name": "v1", "id": "9" }, { "name": "v2" }]),
            json!({ "value": "opaque" }),
            Value::Null,
        ];
        for shape in shapes {
            let once = format(&shape);
            assert_eq!(format(&once), once, "not idempotent for {shape}");
        }
    }

    #[test]
    fn keys_are_normalized() {
        let mappings = HashMap::from([
            ("epic-link".to_string(), "customfield_10014".to_string()),
            ("team".to_string(), "10200".to_string()),
        ]);
        assert_eq!(normalize_field_key("customfield_1", &mappings), "customfield_1");
        assert_eq!(normalize_field_key("10050", &mappings), "customfield_10050");
        assert_eq!(normalize_field_key("epic-link", &mappings), "customfield_10014");
        assert_eq!(normalize_field_key("team", &mappings), "customfield_10200");
        assert_eq!(normalize_field_key("labels", &mappings), "labels");
    }

    #[test]
    fn prepare_formats_only_custom_fields() {
        let mappings = HashMap::from([("epic-link".to_string(), "customfield_10014".to_string())]);
        let mut fields = Map::new();
        fields.insert("10050".into(), json!({ "id": "7", "value": "P1" }));
        fields.insert("epic-link".into(), json!("OPS-1"));
        fields.insert("priority".into(), json!({ "id": "2", "name": "High" }));

        let prepared = prepare_fields(&fields, &mappings);
        assert_eq!(prepared["customfield_10050"], json!({ "id": "7" }));
        assert_eq!(prepared["customfield_10014"], json!("OPS-1"));
        assert_eq!(prepared["priority"], json!({ "id": "2", "name": "High" }));
        assert_eq!(prepared.len(), 3);
    }
}
