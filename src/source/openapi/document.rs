//! OpenAPI document loading and `$ref` resolution
//!
//! The document model is deliberately partial: it keeps the pieces tool
//! synthesis needs (info, servers, operations, parameters, bodies,
//! responses) and carries everything schema-shaped as raw
//! `serde_json::Value`. References are inlined at load time, local
//! (`#/...`), sibling file, and remote `http(s)` documents alike, with a
//! depth cap so cyclic schemas stay bounded.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Maximum `$ref` expansion depth. Past this, the schema degrades to a
/// plain string type and a diagnostic is recorded.
const MAX_REF_DEPTH: usize = 16;

/// Parsed OpenAPI document, references inlined.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// OpenAPI version declaration ("3.0.3", "3.1.0", ...)
    #[serde(default)]
    pub openapi: Option<String>,
    /// Info block
    pub info: DocInfo,
    /// Server list; the first entry supplies a default base URL
    #[serde(default)]
    pub servers: Vec<Server>,
    /// Path templates to path items. BTreeMap keeps iteration stable so
    /// the same document always yields the same tool order.
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

/// OpenAPI info block
#[derive(Debug, Clone, Deserialize)]
pub struct DocInfo {
    /// API title
    #[serde(default)]
    pub title: String,
    /// API version
    #[serde(default)]
    pub version: String,
    /// API description
    #[serde(default)]
    pub description: Option<String>,
}

/// Server entry
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Server URL
    pub url: String,
}

/// One path template with its per-method operations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(default)]
    pub get: Option<Operation>,
    /// PUT operation
    #[serde(default)]
    pub put: Option<Operation>,
    /// POST operation
    #[serde(default)]
    pub post: Option<Operation>,
    /// DELETE operation
    #[serde(default)]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(default)]
    pub patch: Option<Operation>,
    /// HEAD operation
    #[serde(default)]
    pub head: Option<Operation>,
    /// OPTIONS operation
    #[serde(default)]
    pub options: Option<Operation>,
    /// TRACE operation
    #[serde(default)]
    pub trace: Option<Operation>,
    /// Parameters shared by every operation under this path
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// Iterate the operations present on this path item, in a fixed
    /// method order.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        [
            ("get", &self.get),
            ("put", &self.put),
            ("post", &self.post),
            ("delete", &self.delete),
            ("patch", &self.patch),
            ("head", &self.head),
            ("options", &self.options),
            ("trace", &self.trace),
        ]
        .into_iter()
        .filter_map(|(m, op)| op.as_ref().map(|o| (m, o)))
    }
}

/// One HTTP operation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Unique operation identifier, used for tool naming when present
    #[serde(default)]
    pub operation_id: Option<String>,
    /// Short summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Long description, preferred over the summary
    #[serde(default)]
    pub description: Option<String>,
    /// Operation-level parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body, when the operation accepts one
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code or "default"
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
}

/// Operation parameter
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    /// Parameter name as it appears on the wire
    pub name: String,
    /// Location: path, query, header or cookie
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,
    /// Parameter description, copied into the tool schema verbatim
    #[serde(default)]
    pub description: Option<String>,
    /// Parameter schema, already `$ref`-resolved
    #[serde(default)]
    pub schema: Option<Value>,
}

/// Request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    /// Whether a body must be supplied
    #[serde(default)]
    pub required: bool,
    /// Body description
    #[serde(default)]
    pub description: Option<String>,
    /// Media type to schema holder
    #[serde(default)]
    pub content: BTreeMap<String, MediaType>,
}

/// Media type entry in a request body or response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    /// Media type schema, already `$ref`-resolved
    #[serde(default)]
    pub schema: Option<Value>,
}

/// Response entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    /// Response description
    #[serde(default)]
    pub description: Option<String>,
    /// Response content keyed by media type
    #[serde(default)]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// Load an OpenAPI document from a file path or `http(s)://` URL.
///
/// In strict mode any resolution diagnostic fails the load with the
/// joined messages. In permissive mode a single warning carries the
/// diagnostic count and the partial model is returned; unresolved
/// references degrade to `{"type": "string"}`.
pub async fn load(location: &str, strict: bool) -> Result<Document> {
    let raw = fetch_raw(location).await?;
    let mut root = parse_raw(&raw, location)?;

    let mut resolver = Resolver::new(location.to_string());
    resolver.prefetch(&root).await?;
    resolver.inline(&mut root);

    if !resolver.diagnostics.is_empty() {
        if strict {
            return Err(Error::SpecInvalid(resolver.diagnostics.join("; ")));
        }
        warn!(
            errors = resolver.diagnostics.len(),
            location = %location,
            "OpenAPI document built with unresolved issues"
        );
    }

    let doc: Document = serde_json::from_value(root)
        .map_err(|e| Error::SpecMalformed(format!("{location}: {e}")))?;

    debug!(
        title = %doc.info.title,
        paths = doc.paths.len(),
        "Loaded OpenAPI document"
    );
    Ok(doc)
}

/// Fetch raw bytes from a URL or the local filesystem.
async fn fetch_raw(location: &str) -> Result<String> {
    if is_remote(location) {
        let resp = reqwest::get(location)
            .await
            .map_err(|e| Error::SpecUnreachable(format!("{location}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::SpecUnreachable(format!("{location}: HTTP {status}")));
        }
        resp.text()
            .await
            .map_err(|e| Error::SpecUnreachable(format!("{location}: {e}")))
    } else {
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| Error::SpecUnreachable(format!("{location}: {e}")))
    }
}

/// Parse a YAML or JSON document body into a raw JSON value.
fn parse_raw(content: &str, location: &str) -> Result<Value> {
    // JSON first: every JSON document is also valid YAML, but going
    // through serde_json keeps integer/float fidelity for .json specs.
    serde_json::from_str(content)
        .or_else(|_| serde_yaml::from_str(content))
        .map_err(|e: serde_yaml::Error| Error::SpecMalformed(format!("{location}: {e}")))
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Reference resolver: prefetches every external document reachable from
/// the root, then inlines all `$ref` nodes with a bounded depth.
struct Resolver {
    /// Location the root document was loaded from (for relative refs)
    base: String,
    /// External documents keyed by their resolved location
    external: BTreeMap<String, Value>,
    /// Collected resolution problems
    diagnostics: Vec<String>,
}

impl Resolver {
    fn new(base: String) -> Self {
        Self {
            base,
            external: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Fetch every external document referenced from `root`, breadth
    /// first, so the later inline pass can run synchronously. A fetch
    /// failure becomes a diagnostic, not a hard error.
    async fn prefetch(&mut self, root: &Value) -> Result<()> {
        let mut queue: Vec<String> = Vec::new();
        collect_external_refs(root, &self.base, &mut queue);

        while let Some(loc) = queue.pop() {
            if self.external.contains_key(&loc) {
                continue;
            }
            match fetch_raw(&loc).await.and_then(|s| parse_raw(&s, &loc)) {
                Ok(doc) => {
                    collect_external_refs(&doc, &loc, &mut queue);
                    self.external.insert(loc, doc);
                }
                Err(e) => {
                    self.diagnostics.push(format!("failed to load {loc}: {e}"));
                    // Mark as attempted so we do not refetch
                    self.external.insert(loc, Value::Null);
                }
            }
        }
        Ok(())
    }

    /// Replace every `$ref` node in `root` with its resolved target.
    fn inline(&mut self, root: &mut Value) {
        let snapshot = root.clone();
        self.inline_value(root, &snapshot, &self.base.clone(), 0);
    }

    fn inline_value(&mut self, value: &mut Value, root: &Value, doc_loc: &str, depth: usize) {
        if let Some(reference) = value
            .as_object()
            .and_then(|o| o.get("$ref"))
            .and_then(Value::as_str)
            .map(str::to_string)
        {
            if depth >= MAX_REF_DEPTH {
                self.diagnostics
                    .push(format!("reference depth limit reached at {reference}"));
                *value = serde_json::json!({"type": "string"});
                return;
            }
            match self.lookup(&reference, root, doc_loc) {
                Some((mut target, target_loc, target_root)) => {
                    self.inline_value(&mut target, &target_root, &target_loc, depth + 1);
                    *value = target;
                }
                None => {
                    self.diagnostics
                        .push(format!("unresolved reference {reference}"));
                    *value = serde_json::json!({"type": "string"});
                }
            }
            return;
        }

        match value {
            Value::Object(map) => {
                for (_, v) in map.iter_mut() {
                    self.inline_value(v, root, doc_loc, depth);
                }
            }
            Value::Array(items) => {
                for v in items.iter_mut() {
                    self.inline_value(v, root, doc_loc, depth);
                }
            }
            _ => {}
        }
    }

    /// Resolve a reference string to (target value, owning document
    /// location, owning document root).
    fn lookup(&self, reference: &str, root: &Value, doc_loc: &str) -> Option<(Value, String, Value)> {
        let (loc_part, pointer) = match reference.split_once('#') {
            Some((l, p)) => (l, p.to_string()),
            None => (reference, String::new()),
        };

        if loc_part.is_empty() {
            // Local reference within the current document
            return json_pointer(root, &pointer)
                .map(|v| (v.clone(), doc_loc.to_string(), root.clone()));
        }

        let resolved_loc = resolve_location(doc_loc, loc_part);
        let doc = self.external.get(&resolved_loc)?;
        if doc.is_null() {
            return None;
        }
        json_pointer(doc, &pointer).map(|v| (v.clone(), resolved_loc, doc.clone()))
    }
}

/// Walk a raw document and record every reference that points outside it.
fn collect_external_refs(value: &Value, doc_loc: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(r) = map.get("$ref").and_then(Value::as_str) {
                let loc_part = r.split_once('#').map_or(r, |(l, _)| l);
                if !loc_part.is_empty() {
                    out.push(resolve_location(doc_loc, loc_part));
                }
            }
            for v in map.values() {
                collect_external_refs(v, doc_loc, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_external_refs(v, doc_loc, out);
            }
        }
        _ => {}
    }
}

/// Resolve a reference location against the document it appears in.
/// Absolute URLs pass through; everything else is joined relative to the
/// current document's URL or directory.
fn resolve_location(doc_loc: &str, loc_part: &str) -> String {
    if is_remote(loc_part) {
        return loc_part.to_string();
    }
    if is_remote(doc_loc) {
        if let Ok(base) = url::Url::parse(doc_loc) {
            if let Ok(joined) = base.join(loc_part) {
                return joined.to_string();
            }
        }
        return loc_part.to_string();
    }
    let dir = std::path::Path::new(doc_loc)
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."));
    dir.join(loc_part).to_string_lossy().into_owned()
}

/// Minimal RFC 6901 pointer lookup ("/components/schemas/User").
fn json_pointer<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() || pointer == "/" {
        return Some(root);
    }
    let mut current = root;
    for token in pointer.trim_start_matches('/').split('/') {
        let token = token.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&token)?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PETS_SPEC: &str = r##"
openapi: "3.0.3"
info:
  title: Pets
  version: "1.2"
paths:
  /pets/{petId}:
    get:
      operationId: getPet
      parameters:
        - name: petId
          in: path
          required: true
          schema:
            $ref: "#/components/schemas/PetId"
      responses:
        "200":
          description: ok
components:
  schemas:
    PetId:
      type: integer
      description: Pet identifier
"##;

    #[tokio::test]
    async fn loads_yaml_from_file_and_resolves_local_refs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pets.yaml");
        std::fs::write(&path, PETS_SPEC).unwrap();

        let doc = load(path.to_str().unwrap(), true).await.unwrap();
        assert_eq!(doc.info.title, "Pets");

        let op = doc.paths["/pets/{petId}"].get.as_ref().unwrap();
        let schema = op.parameters[0].schema.as_ref().unwrap();
        assert_eq!(schema["type"], "integer");
    }

    #[tokio::test]
    async fn strict_mode_rejects_unresolved_refs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "openapi": "3.0.0",
                "info": {"title": "Broken", "version": "1"},
                "paths": {
                    "/a": {"get": {
                        "parameters": [{
                            "name": "q", "in": "query",
                            "schema": {"$ref": "#/components/schemas/Missing"}
                        }],
                        "responses": {}
                    }}
                }
            }))
            .unwrap(),
        )
        .unwrap();

        let err = load(path.to_str().unwrap(), true).await.unwrap_err();
        assert!(matches!(err, Error::SpecInvalid(_)));
    }

    #[tokio::test]
    async fn permissive_mode_degrades_unresolved_refs_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "openapi": "3.0.0",
                "info": {"title": "Broken", "version": "1"},
                "paths": {
                    "/a": {"get": {
                        "parameters": [{
                            "name": "q", "in": "query",
                            "schema": {"$ref": "#/components/schemas/Missing"}
                        }],
                        "responses": {}
                    }}
                }
            }))
            .unwrap(),
        )
        .unwrap();

        let doc = load(path.to_str().unwrap(), false).await.unwrap();
        let op = doc.paths["/a"].get.as_ref().unwrap();
        assert_eq!(op.parameters[0].schema.as_ref().unwrap()["type"], "string");
    }

    #[tokio::test]
    async fn cyclic_refs_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cyclic.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "openapi": "3.0.0",
                "info": {"title": "Cyclic", "version": "1"},
                "paths": {
                    "/n": {"post": {
                        "requestBody": {"content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Node"}
                        }}},
                        "responses": {}
                    }}
                },
                "components": {"schemas": {"Node": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/components/schemas/Node"}}
                }}}
            }))
            .unwrap(),
        )
        .unwrap();

        // Permissive load must terminate and keep the outer object shape.
        let doc = load(path.to_str().unwrap(), false).await.unwrap();
        let op = doc.paths["/n"].post.as_ref().unwrap();
        let body = op.request_body.as_ref().unwrap();
        let schema = body.content["application/json"].schema.as_ref().unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[tokio::test]
    async fn file_refs_resolve_relative_to_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("common.json"),
            serde_json::to_string(&json!({
                "schemas": {"Limit": {"type": "integer"}}
            }))
            .unwrap(),
        )
        .unwrap();
        let path = dir.path().join("api.json");
        std::fs::write(
            &path,
            serde_json::to_string(&json!({
                "openapi": "3.0.0",
                "info": {"title": "Split", "version": "1"},
                "paths": {
                    "/a": {"get": {
                        "parameters": [{
                            "name": "limit", "in": "query",
                            "schema": {"$ref": "common.json#/schemas/Limit"}
                        }],
                        "responses": {}
                    }}
                }
            }))
            .unwrap(),
        )
        .unwrap();

        let doc = load(path.to_str().unwrap(), true).await.unwrap();
        let op = doc.paths["/a"].get.as_ref().unwrap();
        assert_eq!(op.parameters[0].schema.as_ref().unwrap()["type"], "integer");
    }

    #[test]
    fn json_pointer_handles_escapes() {
        let v = json!({"a/b": {"c": 1}, "arr": [10, 20]});
        assert_eq!(json_pointer(&v, "/a~1b/c"), Some(&json!(1)));
        assert_eq!(json_pointer(&v, "/arr/1"), Some(&json!(20)));
        assert_eq!(json_pointer(&v, "/missing"), None);
    }

    #[tokio::test]
    async fn unreachable_file_is_spec_unreachable() {
        let err = load("/nonexistent/spec.yaml", false).await.unwrap_err();
        assert!(matches!(err, Error::SpecUnreachable(_)));
    }
}
