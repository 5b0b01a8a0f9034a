use serde_json::{Map, Value};
use tracing::warn;

/// Joins the keys of nested objects.
pub const SEPARATOR: &str = "__";

/// A record with no nested objects, keyed by composite field name.
pub type FlatRecord = Map<String, Value>;

/// Field name to JSON schema `type`, with nested objects expanded.
pub type FlatSchema = Map<String, Value>;

/// Flattens a record into a single-level mapping.
///
/// Nested objects contribute their fields under `parent__child` names, arrays
/// are stored as their JSON text and every other value is kept as is. Keys
/// keep the order in which they appear. A value that is not an object has no
/// fields and flattens to an empty mapping.
pub fn flatten(record: Value) -> FlatRecord {
    let mut flat = FlatRecord::new();
    if let Value::Object(fields) = record {
        flatten_into(fields, None, &mut flat);
    }
    flat
}

fn flatten_into(fields: Map<String, Value>, parent: Option<&str>, flat: &mut FlatRecord) {
    for (key, value) in fields {
        let name = join_key(parent, &key);
        match value {
            Value::Object(inner) => flatten_into(inner, Some(&name), flat),
            Value::Array(_) => {
                flat.insert(name, Value::String(value.to_string()));
            }
            scalar => {
                flat.insert(name, scalar);
            }
        }
    }
}

/// Flattens the `properties` of a JSON schema into field types.
///
/// Properties typed as `object` that declare their own `properties` are
/// expanded with the same naming as [`flatten`].
pub fn flatten_schema(properties: &Map<String, Value>) -> FlatSchema {
    let mut flat = FlatSchema::new();
    flatten_schema_into(properties, None, &mut flat);
    flat
}

fn flatten_schema_into(properties: &Map<String, Value>, parent: Option<&str>, flat: &mut FlatSchema) {
    for (key, property) in properties {
        let name = join_key(parent, key);
        let field_type = property.get("type");
        if field_type.is_none() {
            warn!(field = %name, schema = %property, "schema field has no type, support is limited");
        }

        let nested = property.get("properties").and_then(Value::as_object);
        match nested {
            Some(inner) if field_type.is_some_and(is_object_type) => {
                flatten_schema_into(inner, Some(&name), flat);
            }
            _ => {
                flat.insert(name, field_type.cloned().unwrap_or(Value::Null));
            }
        }
    }
}

fn is_object_type(field_type: &Value) -> bool {
    match field_type {
        Value::String(name) => name == "object",
        Value::Array(names) => names.iter().any(|name| name.as_str() == Some("object")),
        _ => false,
    }
}

fn join_key(parent: Option<&str>, key: &str) -> String {
    match parent {
        Some(parent) => format!("{parent}{SEPARATOR}{key}"),
        None => key.to_string(),
    }
}
