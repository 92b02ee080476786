//! Sample value generation
//!
//! Builds pretty-printable JSON mocks from a schema, used for the
//! "Example request/response" blocks in tool descriptions. Generation
//! ignores `required` so mocks show every field, and recursion is
//! depth-capped because schemas inlined from cyclic `$ref`s can nest
//! deeply.

use serde_json::{Map, Value, json};

use super::content::schema_type;

/// Maximum object/array nesting in a generated mock.
const MAX_SAMPLE_DEPTH: usize = 8;

/// Generate a mock value for a schema.
#[must_use]
pub fn mock_value(schema: &Value) -> Value {
    mock_at(schema, 0)
}

fn mock_at(schema: &Value, depth: usize) -> Value {
    if depth >= MAX_SAMPLE_DEPTH {
        return Value::Null;
    }

    if let Some(example) = schema.get("example") {
        return example.clone();
    }
    if let Some(first) = schema
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|e| e.first())
    {
        return first.clone();
    }

    match schema_type(schema).as_str() {
        "object" => {
            let mut obj = Map::new();
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                for (name, prop) in props {
                    obj.insert(name.clone(), mock_at(prop, depth + 1));
                }
            }
            Value::Object(obj)
        }
        "array" => {
            let item = schema
                .get("items")
                .map_or(Value::Null, |items| mock_at(items, depth + 1));
            json!([item])
        }
        "integer" => json!(0),
        "number" => json!(0.0),
        "boolean" => json!(true),
        _ => mock_string(schema),
    }
}

fn mock_string(schema: &Value) -> Value {
    match schema.get("format").and_then(Value::as_str) {
        Some("date-time") => json!("2024-01-01T00:00:00Z"),
        Some("date") => json!("2024-01-01"),
        Some("uuid") => json!("00000000-0000-0000-0000-000000000000"),
        Some("email") => json!("user@example.com"),
        Some("uri") => json!("https://example.com"),
        _ => json!("string"),
    }
}
