//! Conversions between Value and the serde value types of each format.

use yamlfs_core_store::{Map, Value};

/// Convert a parsed YAML value into our Value.
///
/// Mapping keys are always strings in the tree, so non-string YAML keys
/// (`1: one`, `true: yes`) are stored under their YAML spelling. Tags are
/// dropped and the tagged value is kept.
pub fn yaml_to_value(yaml: serde_yaml_ng::Value) -> Value {
    match yaml {
        serde_yaml_ng::Value::Null => Value::Null,
        serde_yaml_ng::Value::Bool(b) => Value::Bool(b),
        serde_yaml_ng::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                // Fallback for integers beyond i64
                Value::String(n.to_string())
            }
        }
        serde_yaml_ng::Value::String(s) => Value::String(s),
        serde_yaml_ng::Value::Sequence(items) => {
            Value::Sequence(items.into_iter().map(yaml_to_value).collect())
        }
        serde_yaml_ng::Value::Mapping(mapping) => Value::Map(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_value(v)))
                .collect::<Map>(),
        ),
        serde_yaml_ng::Value::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

fn yaml_key_to_string(key: serde_yaml_ng::Value) -> String {
    match key {
        serde_yaml_ng::Value::String(s) => s,
        serde_yaml_ng::Value::Null => "null".to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Tagged(tagged) => yaml_key_to_string(tagged.value),
        complex => serde_yaml_ng::to_string(&complex)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Convert our Value into a YAML value.
pub fn value_to_yaml(value: &Value) -> serde_yaml_ng::Value {
    match value {
        Value::Null => serde_yaml_ng::Value::Null,
        Value::Bool(b) => serde_yaml_ng::Value::Bool(*b),
        Value::Integer(i) => serde_yaml_ng::Value::Number((*i).into()),
        Value::Float(f) => serde_yaml_ng::Value::Number((*f).into()),
        Value::String(s) => serde_yaml_ng::Value::String(s.clone()),
        Value::Sequence(items) => {
            serde_yaml_ng::Value::Sequence(items.iter().map(value_to_yaml).collect())
        }
        Value::Map(map) => {
            let mut mapping = serde_yaml_ng::Mapping::new();
            for (k, v) in map {
                mapping.insert(serde_yaml_ng::Value::String(k.clone()), value_to_yaml(v));
            }
            serde_yaml_ng::Value::Mapping(mapping)
        }
    }
}

/// Convert our Value to serde_json::Value.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        // JSON has no NaN or infinities
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Sequence(items.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}
