//! Tool descriptors and execution results
//!
//! A [`ToolDescriptor`] is the serializable record an app persists for
//! every synthesized tool. The handler function itself is never
//! serialized; it is re-attached after a config load.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::{Tool, ToolAnnotations};

/// Handler bound to a tool: takes the raw call arguments, returns an
/// execution result. Errors are carried inside the result, never beside it.
pub type ToolHandler =
    Arc<dyn Fn(serde_json::Map<String, Value>) -> BoxFuture<'static, ExecutionResult> + Send + Sync>;

/// Serializable description of one tool plus the coordinates its handler
/// needs to rebuild the HTTP request.
#[derive(Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (lowercased, path characters mapped to underscores)
    pub name: String,
    /// Tool description shown to MCP clients
    pub description: String,
    /// Flattened JSON schema with prefix-encoded property names
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Behavioral hints derived from the HTTP method
    pub annotations: ToolAnnotations,
    /// Operation coordinates driving invocation
    #[serde(rename = "handlerInput")]
    pub handler_input: HandlerInput,
    /// Source-type tag, matches the owning app's tag
    #[serde(rename = "sourceType")]
    pub source_type: String,
    /// Attached handler; absent after deserialization
    #[serde(skip)]
    pub handler: Option<ToolHandler>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("source_type", &self.source_type)
            .field("handler", &self.handler.as_ref().map(|_| "attached"))
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Protocol-level view of this descriptor for `tools/list`.
    #[must_use]
    pub fn to_protocol_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.clone(),
            annotations: Some(self.annotations.clone()),
        }
    }
}

/// Per-tool operation coordinates that survive serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerInput {
    /// HTTP method (uppercase verb)
    pub method: String,
    /// Path template with `{name}` placeholders, verbatim from the document
    pub path: String,
    /// Resolved request content type; empty for bodyless operations
    #[serde(rename = "contentType", default)]
    pub content_type: String,
    /// Static headers applied to every call (reserved for processors)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Static cookies applied to every call (reserved for processors)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    /// Values appended to every body (reserved for processors)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub body_append: BTreeMap<String, Value>,
}

impl HandlerInput {
    /// Create handler input for an operation.
    #[must_use]
    pub fn new(method: &str, path: &str, content_type: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            body_append: BTreeMap::new(),
        }
    }
}

/// Well-known metadata keys on an [`ExecutionResult`].
pub mod meta {
    /// RFC 3339 timestamp of when the call started
    pub const EXECUTION_TIME: &str = "executionTime";
    /// Upstream HTTP status code
    pub const HTTP_STATUS: &str = "httpStatus";
    /// Round-trip time in milliseconds
    pub const RESPONSE_TIME: &str = "responseTime";
    /// HTTP method of the upstream request
    pub const HTTP_METHOD: &str = "httpMethod";
    /// Fully substituted request URL
    pub const FINAL_URL: &str = "finalURL";
    /// Upstream response headers
    pub const RESPONSE_HEADERS: &str = "responseHeaders";
    /// Upstream response Content-Type
    pub const ACTUAL_CONTENT_TYPE: &str = "actualContentType";
    /// True when the response body is JSON
    pub const IS_JSON_DATA: &str = "isJsonData";
    /// Preferred display format for the body
    pub const PREFERRED_FORMAT: &str = "preferredFormat";
    /// True when HTTP status >= 400
    pub const IS_ERROR_RESPONSE: &str = "isErrorResponse";
    /// Downstream processors should redact this response
    pub const SHOULD_REDACT: &str = "shouldRedact";
    /// Body exceeds the display threshold
    pub const SHOULD_TRUNCATE: &str = "shouldTruncate";
    /// Suggested display cap in bytes
    pub const MAX_DISPLAY_SIZE: &str = "maxDisplaySize";

    /// Body size above which truncation is suggested
    pub const DISPLAY_THRESHOLD: usize = 10_000;
}

/// Result of one tool invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Formatted upstream response (or an `Error: ...` line)
    pub content: String,
    /// Transport-level error, when the request never completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Advisory metadata for downstream processors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl ExecutionResult {
    /// Build a transport-error result. The error is carried in the
    /// result; the handler still reports success to its caller.
    #[must_use]
    pub fn transport_error(message: &str) -> Self {
        Self {
            content: format!("Error: {message}"),
            error: Some(message.to_string()),
            metadata: BTreeMap::new(),
        }
    }

    /// Insert a metadata entry.
    pub fn set_meta(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }
}
