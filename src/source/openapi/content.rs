//! Content-type strategies
//!
//! An ordered dispatch list consulted twice per tool: at synthesis time
//! to turn a request-body schema into prefix-encoded parameters, and at
//! call time to serialize the body submap into bytes. Registration order
//! is priority order; a `type/*` wildcard pass runs before the JSON
//! fallback.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::params::{BODY_PREFIX, FORM_PREFIX, MULTIPART_PREFIX, encode_key, render_scalar};
use crate::{Error, Result};

/// Parameters extracted from a request-body schema.
#[derive(Debug, Clone, Default)]
pub struct ExtractedBody {
    /// Property name → JSON-schema fragment, names already prefixed
    pub properties: Map<String, Value>,
    /// Required property names, already prefixed
    pub required: Vec<String>,
}

/// Serialized request body.
#[derive(Debug, Clone)]
pub struct BodyPayload {
    /// Raw body bytes
    pub bytes: Vec<u8>,
    /// Content-Type override; multipart sets this to carry its boundary
    pub content_type: Option<String>,
}

/// Body handling family for a set of media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// JSON object bodies (`body__*` parameters)
    Json,
    /// XML bodies; structured schemas behave like JSON, everything else
    /// is a single verbatim string
    Xml,
    /// `application/x-www-form-urlencoded` (`form__*` parameters)
    Form,
    /// `multipart/form-data` (`multipart__*` parameters)
    Multipart,
    /// Plain text: always one `body` string
    Text,
}

/// One registered content-type strategy.
#[derive(Debug, Clone)]
pub struct Strategy {
    /// Media types this strategy claims
    pub media_types: &'static [&'static str],
    /// Handling family
    pub kind: StrategyKind,
}

/// Ordered strategy registry. Constructed once per adapter, read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct ContentTypeRegistry {
    strategies: Vec<Strategy>,
}

impl Default for ContentTypeRegistry {
    fn default() -> Self {
        Self {
            strategies: vec![
                Strategy {
                    media_types: &[
                        "application/json",
                        "*/*",
                        "application/hal+json",
                        "application/vnd.api+json",
                    ],
                    kind: StrategyKind::Json,
                },
                Strategy {
                    media_types: &["application/xml", "text/xml"],
                    kind: StrategyKind::Xml,
                },
                Strategy {
                    media_types: &["application/x-www-form-urlencoded"],
                    kind: StrategyKind::Form,
                },
                Strategy {
                    media_types: &["multipart/form-data"],
                    kind: StrategyKind::Multipart,
                },
                Strategy {
                    media_types: &["text/plain", "text/*"],
                    kind: StrategyKind::Text,
                },
            ],
        }
    }
}

impl ContentTypeRegistry {
    /// Select the winning strategy for an operation's declared content
    /// types. Returns the resolved content type (the declared type that
    /// matched) and the strategy. Exact matches win first in
    /// registration order, then a `type/*` wildcard pass, then the JSON
    /// fallback with the first declared type.
    #[must_use]
    pub fn select<'a>(&self, declared: &'a [&'a str]) -> Option<(&'a str, &Strategy)> {
        let first = *declared.first()?;

        for strategy in &self.strategies {
            for ct in declared {
                if strategy.media_types.iter().any(|m| m == ct) {
                    return Some((*ct, strategy));
                }
            }
        }

        // Wildcard pass: match "type/*" entries against declared types
        for strategy in &self.strategies {
            for ct in declared {
                let family = ct.split_once('/').map(|(t, _)| t).unwrap_or(ct);
                let wildcard = format!("{family}/*");
                if strategy.media_types.iter().any(|m| *m == wildcard) {
                    return Some((*ct, strategy));
                }
            }
        }

        // Fallback: JSON handling for anything else
        self.strategies
            .iter()
            .find(|s| s.kind == StrategyKind::Json)
            .map(|s| (first, s))
    }

    /// Look up the strategy for an already-resolved content type, used at
    /// call time. Falls back to JSON.
    #[must_use]
    pub fn for_content_type(&self, content_type: &str) -> &Strategy {
        self.select(&[content_type])
            .map(|(_, s)| s)
            .unwrap_or(&self.strategies[0])
    }
}

impl Strategy {
    /// Extract prefix-encoded tool parameters from a request-body schema.
    #[must_use]
    pub fn extract(&self, schema: Option<&Value>, body_required: bool) -> ExtractedBody {
        match self.kind {
            StrategyKind::Json => structured_properties(schema, BODY_PREFIX)
                .unwrap_or_else(|| single_body_param(body_required, "Request body")),
            StrategyKind::Xml => structured_properties(schema, BODY_PREFIX)
                .unwrap_or_else(|| single_body_param(body_required, "Raw XML request body")),
            StrategyKind::Form => structured_properties(schema, FORM_PREFIX)
                .unwrap_or_else(|| single_body_param(body_required, "Form-encoded request body")),
            StrategyKind::Multipart => multipart_properties(schema)
                .unwrap_or_else(|| single_body_param(body_required, "Multipart request body")),
            StrategyKind::Text => single_body_param(true, "Plain text request body"),
        }
    }

    /// Serialize the body submap into bytes.
    ///
    /// A single unprefixed `body` string is always honored verbatim. An
    /// empty submap yields no body.
    pub fn serialize(&self, body: &BTreeMap<String, Value>) -> Result<Option<BodyPayload>> {
        if body.is_empty() {
            return Ok(None);
        }

        if let Some(raw) = verbatim_body(body) {
            return Ok(Some(BodyPayload {
                bytes: raw.into_bytes(),
                content_type: None,
            }));
        }

        match self.kind {
            StrategyKind::Json | StrategyKind::Xml => {
                // XML marshalling of object-shaped bodies is out of
                // scope; JSON is the documented fallback encoding.
                let map: Map<String, Value> = body
                    .iter()
                    .map(|(k, v)| (strip_prefix(k), v.clone()))
                    .collect();
                let bytes = serde_json::to_vec(&Value::Object(map))?;
                Ok(Some(BodyPayload {
                    bytes,
                    content_type: None,
                }))
            }
            StrategyKind::Form => {
                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (key, value) in body {
                    if let Some(name) = key.strip_prefix(&const_prefix(FORM_PREFIX)) {
                        serializer.append_pair(name, &render_scalar(value));
                    }
                }
                Ok(Some(BodyPayload {
                    bytes: serializer.finish().into_bytes(),
                    content_type: None,
                }))
            }
            StrategyKind::Multipart => {
                let boundary = format!("makemcp-{}", uuid::Uuid::new_v4().simple());
                let mut out = String::new();
                for (key, value) in body {
                    let Some(name) = key.strip_prefix(&const_prefix(MULTIPART_PREFIX)) else {
                        continue;
                    };
                    // TODO: stream schema-declared binary fields as file
                    // parts instead of text.
                    out.push_str(&format!(
                        "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{}\r\n",
                        render_scalar(value)
                    ));
                }
                out.push_str(&format!("--{boundary}--\r\n"));
                Ok(Some(BodyPayload {
                    bytes: out.into_bytes(),
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                }))
            }
            StrategyKind::Text => Err(Error::ParamsInvalid(
                "text body requires a single 'body' string argument".to_string(),
            )),
        }
    }
}

/// Prefix plus separator, for `strip_prefix` on flat keys.
fn const_prefix(prefix: &str) -> String {
    format!("{prefix}__")
}

/// The single-`body` escape hatch: one `body` key holding a string.
fn verbatim_body(body: &BTreeMap<String, Value>) -> Option<String> {
    if body.len() != 1 {
        return None;
    }
    body.get("body").and_then(Value::as_str).map(str::to_string)
}

/// Remove a retained `form__`/`multipart__` prefix from a flat body
/// key. JSON and XML keys arrive as bare property names and pass
/// through untouched, even when the property name itself contains `__`.
fn strip_prefix(key: &str) -> String {
    for prefix in [FORM_PREFIX, MULTIPART_PREFIX] {
        if let Some(name) = key.strip_prefix(&const_prefix(prefix)) {
            return name.to_string();
        }
    }
    key.to_string()
}

/// Enumerate named schema properties into prefixed parameter entries.
/// Returns `None` when the schema has no named properties.
fn structured_properties(schema: Option<&Value>, prefix: &str) -> Option<ExtractedBody> {
    let schema = schema?;
    let props = schema.get("properties")?.as_object()?;
    if props.is_empty() {
        return None;
    }

    let mut extracted = ExtractedBody::default();
    for (name, prop) in props {
        extracted
            .properties
            .insert(encode_key(prefix, name), property_entry(prop));
    }
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            extracted.required.push(encode_key(prefix, name));
        }
    }
    Some(extracted)
}

/// Multipart extraction: like structured extraction, but schema `binary`
/// format is surfaced as logical type `file`.
fn multipart_properties(schema: Option<&Value>) -> Option<ExtractedBody> {
    let mut extracted = structured_properties(schema, MULTIPART_PREFIX)?;
    for (_, entry) in extracted.properties.iter_mut() {
        if entry.get("format").and_then(Value::as_str) == Some("binary") {
            entry["type"] = json!("file");
            entry["description"] = json!("File content (sent as text; binary upload is limited)");
        }
    }
    Some(extracted)
}

/// One required-or-optional `body` string parameter for unstructured
/// content types.
fn single_body_param(required: bool, description: &str) -> ExtractedBody {
    let mut extracted = ExtractedBody::default();
    extracted.properties.insert(
        "body".to_string(),
        json!({"type": "string", "description": description}),
    );
    if required {
        extracted.required.push("body".to_string());
    }
    extracted
}

/// Scalar type name from a schema fragment: first element of a `type`
/// array, or the string itself, defaulting to `string`.
#[must_use]
pub fn schema_type(schema: &Value) -> String {
    match schema.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .first()
            .and_then(Value::as_str)
            .unwrap_or("string")
            .to_string(),
        _ => "string".to_string(),
    }
}

/// Build one flattened property entry from a schema fragment: scalar
/// type plus the description copied verbatim.
fn property_entry(schema: &Value) -> Value {
    let mut entry = json!({"type": schema_type(schema)});
    if let Some(desc) = schema.get("description").and_then(Value::as_str) {
        entry["description"] = json!(desc);
    }
    if let Some(format) = schema.get("format").and_then(Value::as_str) {
        entry["format"] = json!(format);
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn json_wins_over_xml_when_both_declared() {
        let reg = ContentTypeRegistry::default();
        let (ct, strategy) = reg
            .select(&["application/xml", "application/json"])
            .unwrap();
        assert_eq!(ct, "application/json");
        assert_eq!(strategy.kind, StrategyKind::Json);
    }

    #[test]
    fn wildcard_pass_catches_text_csv() {
        let reg = ContentTypeRegistry::default();
        let (ct, strategy) = reg.select(&["text/csv"]).unwrap();
        assert_eq!(ct, "text/csv");
        assert_eq!(strategy.kind, StrategyKind::Text);
    }

    #[test]
    fn unknown_type_falls_back_to_json() {
        let reg = ContentTypeRegistry::default();
        let (ct, strategy) = reg.select(&["application/msgpack"]).unwrap();
        assert_eq!(ct, "application/msgpack");
        assert_eq!(strategy.kind, StrategyKind::Json);
    }

    #[test]
    fn json_extract_prefixes_properties_and_required() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("application/json");
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Full name"},
                "age": {"type": "integer"}
            },
            "required": ["name"]
        });

        let extracted = strategy.extract(Some(&schema), true);
        assert_eq!(extracted.properties["body__name"]["type"], "string");
        assert_eq!(
            extracted.properties["body__name"]["description"],
            "Full name"
        );
        assert_eq!(extracted.properties["body__age"]["type"], "integer");
        assert_eq!(extracted.required, vec!["body__name"]);
    }

    #[test]
    fn xml_without_properties_is_single_body_string() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("text/xml");
        let extracted = strategy.extract(Some(&json!({"type": "string"})), true);
        assert_eq!(extracted.properties.len(), 1);
        assert_eq!(extracted.properties["body"]["type"], "string");
        assert_eq!(extracted.required, vec!["body"]);
    }

    #[test]
    fn multipart_binary_becomes_file_type() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("multipart/form-data");
        let schema = json!({
            "type": "object",
            "properties": {
                "upload": {"type": "string", "format": "binary"},
                "label": {"type": "string"}
            }
        });

        let extracted = strategy.extract(Some(&schema), false);
        assert_eq!(extracted.properties["multipart__upload"]["type"], "file");
        assert_eq!(extracted.properties["multipart__label"]["type"], "string");
    }

    #[test]
    fn json_serialize_encodes_submap() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("application/json");
        let payload = strategy
            .serialize(&body(&[("name", json!("Ada")), ("age", json!(36))]))
            .unwrap()
            .unwrap();
        let decoded: Value = serde_json::from_slice(&payload.bytes).unwrap();
        assert_eq!(decoded, json!({"name": "Ada", "age": 36}));
        assert!(payload.content_type.is_none());
    }

    #[test]
    fn json_serialize_keeps_double_underscore_property_names() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("application/json");
        let payload = strategy
            .serialize(&body(&[("user__name", json!("Ada"))]))
            .unwrap()
            .unwrap();
        let decoded: Value = serde_json::from_slice(&payload.bytes).unwrap();
        assert_eq!(decoded, json!({"user__name": "Ada"}));
    }

    #[test]
    fn verbatim_body_string_passes_through() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("text/xml");
        let payload = strategy
            .serialize(&body(&[("body", json!("<root/>"))]))
            .unwrap()
            .unwrap();
        assert_eq!(payload.bytes, b"<root/>");
    }

    #[test]
    fn form_serialize_percent_encodes() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("application/x-www-form-urlencoded");
        let payload = strategy
            .serialize(&body(&[
                ("form__q", json!("a b")),
                ("form__n", json!(2)),
            ]))
            .unwrap()
            .unwrap();
        let s = String::from_utf8(payload.bytes).unwrap();
        assert!(s.contains("q=a+b"));
        assert!(s.contains("n=2"));
    }

    #[test]
    fn multipart_serialize_sets_boundary_content_type() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("multipart/form-data");
        let payload = strategy
            .serialize(&body(&[("multipart__field", json!("value"))]))
            .unwrap()
            .unwrap();
        let ct = payload.content_type.unwrap();
        assert!(ct.starts_with("multipart/form-data; boundary="));
        let text = String::from_utf8(payload.bytes).unwrap();
        assert!(text.contains("name=\"field\""));
        assert!(text.contains("value"));
    }

    #[test]
    fn empty_body_yields_no_payload() {
        let reg = ContentTypeRegistry::default();
        let strategy = reg.for_content_type("application/json");
        assert!(strategy.serialize(&BTreeMap::new()).unwrap().is_none());
    }

    #[test]
    fn schema_type_reads_first_of_type_array() {
        assert_eq!(schema_type(&json!({"type": ["integer", "null"]})), "integer");
        assert_eq!(schema_type(&json!({"type": "boolean"})), "boolean");
        assert_eq!(schema_type(&json!({})), "string");
    }
}
