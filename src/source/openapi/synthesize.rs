//! Tool synthesis
//!
//! Turns every `(method, path, operation)` triple in a loaded document
//! into one [`ToolDescriptor`] with a flattened, prefix-encoded input
//! schema. Identical documents always synthesize identical tools: path
//! iteration is sorted, methods run in a fixed order, and schema keys
//! are emitted through sorted maps.

use serde_json::{Map, Value, json};
use tracing::debug;

use super::content::{ContentTypeRegistry, StrategyKind, schema_type};
use super::document::{Document, Operation, Parameter, PathItem};
use super::params::encode_key;
use super::sample::mock_value;
use crate::protocol::ToolAnnotations;
use crate::tool::{HandlerInput, ToolDescriptor};

/// Source-type tag stamped on every OpenAPI-derived tool.
pub const SOURCE_TYPE: &str = "openapi";

/// Synthesize tool descriptors for every operation in the document.
#[must_use]
pub fn synthesize(doc: &Document, registry: &ContentTypeRegistry) -> Vec<ToolDescriptor> {
    let mut tools = Vec::new();
    for (path, item) in &doc.paths {
        for (method, operation) in item.operations() {
            tools.push(synthesize_operation(registry, method, path, item, operation));
        }
    }
    debug!(tools = tools.len(), "Synthesized tools");
    tools
}

fn synthesize_operation(
    registry: &ContentTypeRegistry,
    method: &str,
    path: &str,
    item: &PathItem,
    op: &Operation,
) -> ToolDescriptor {
    let name = tool_name(op.operation_id.as_deref(), method, path);

    let mut properties = Map::new();
    let mut required = Vec::new();

    // Path-level parameters apply to every operation under the template;
    // operation-level ones follow so they can shadow nothing but add.
    let combined: Vec<&Parameter> = item.parameters.iter().chain(op.parameters.iter()).collect();
    for location in ["path", "query", "header", "cookie"] {
        for param in combined.iter().filter(|p| p.location == location) {
            let key = encode_key(location, &param.name);
            let mut entry = json!({
                "type": param.schema.as_ref().map_or_else(|| "string".to_string(), schema_type)
            });
            if let Some(desc) = &param.description {
                entry["description"] = json!(desc);
            }
            properties.insert(key.clone(), entry);
            if param.required {
                required.push(key);
            }
        }
    }

    // Request body, if any: the winning content-type strategy supplies
    // already-prefixed properties.
    let mut resolved_content_type = String::new();
    let mut body_schema: Option<Value> = None;
    let mut structured_non_json = false;
    if let Some(body) = &op.request_body {
        let declared: Vec<&str> = body.content.keys().map(String::as_str).collect();
        if let Some((content_type, strategy)) = registry.select(&declared) {
            let schema = body
                .content
                .get(content_type)
                .and_then(|m| m.schema.as_ref());
            let extracted = strategy.extract(schema, body.required);
            for (key, entry) in extracted.properties {
                properties.insert(key, entry);
            }
            required.extend(extracted.required);

            structured_non_json = strategy.kind != StrategyKind::Json
                && schema
                    .and_then(|s| s.get("properties"))
                    .and_then(Value::as_object)
                    .is_some_and(|p| !p.is_empty());
            body_schema = schema.cloned();
            resolved_content_type = content_type.to_string();
        }
    }

    let input_schema = json!({
        "type": "object",
        "properties": properties,
        "required": required,
    });

    let description = build_description(
        method,
        path,
        op,
        body_schema.as_ref(),
        structured_non_json,
    );

    ToolDescriptor {
        annotations: ToolAnnotations::for_http_method(&name, method),
        description,
        input_schema,
        handler_input: HandlerInput::new(method, path, &resolved_content_type),
        source_type: SOURCE_TYPE.to_string(),
        name,
        handler: None,
    }
}

/// Derive the tool name: the operation id when present, otherwise
/// `<method>_<path>`, with braces removed, `/` and `-` mapped to `_`,
/// lowercased.
#[must_use]
pub fn tool_name(operation_id: Option<&str>, method: &str, path: &str) -> String {
    let raw = operation_id.map_or_else(|| format!("{method}_{path}"), str::to_string);
    raw.chars()
        .filter_map(|c| match c {
            '{' | '}' => None,
            '/' | '-' => Some('_'),
            other => Some(other.to_ascii_lowercase()),
        })
        .collect()
}

fn build_description(
    method: &str,
    path: &str,
    op: &Operation,
    body_schema: Option<&Value>,
    structured_non_json: bool,
) -> String {
    let mut description = op
        .description
        .clone()
        .or_else(|| op.summary.clone())
        .unwrap_or_else(|| format!("{} {path}", method.to_ascii_uppercase()));

    if structured_non_json {
        if let Some(schema) = body_schema {
            if let Ok(pretty) = serde_json::to_string_pretty(schema) {
                description.push_str("\n\nExpected structure:\n");
                description.push_str(&pretty);
            }
        }
    }

    if let Some(schema) = body_schema {
        if let Ok(pretty) = serde_json::to_string_pretty(&mock_value(schema)) {
            description.push_str("\n\nExample request:\n");
            description.push_str(&pretty);
        }
    }

    if let Some(schema) = success_response_schema(op) {
        if let Ok(pretty) = serde_json::to_string_pretty(&mock_value(schema)) {
            description.push_str("\n\nExample response:\n");
            description.push_str(&pretty);
        }
    }

    description
}

/// Schema of the first 2xx response carrying content, if any.
fn success_response_schema(op: &Operation) -> Option<&Value> {
    op.responses
        .iter()
        .filter(|(code, _)| code.starts_with('2'))
        .find_map(|(_, resp)| {
            let content = resp.content.as_ref()?;
            content
                .get("application/json")
                .or_else(|| content.values().next())
                .and_then(|m| m.schema.as_ref())
        })
}
