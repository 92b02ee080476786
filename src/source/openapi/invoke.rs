//! Tool invocation
//!
//! Turns a flat argument map back into one upstream HTTP request and
//! formats the response for MCP clients. Transport failures are carried
//! inside the [`ExecutionResult`] rather than surfaced as call errors,
//! so the model always sees what happened.

use std::collections::BTreeMap;
use std::time::Instant;

use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use super::content::{BodyPayload, ContentTypeRegistry};
use super::params::{ToolParams, render_scalar};
use crate::tool::{ExecutionResult, HandlerInput, meta};
use crate::{Error, Result};

/// Content type applied when a body exists but the operation resolved
/// none.
const DEFAULT_BODY_CONTENT_TYPE: &str = "application/json";

/// Executes upstream HTTP requests for every tool of one app. Cheap to
/// clone; the inner client is shared.
#[derive(Debug, Clone)]
pub struct Invoker {
    client: reqwest::Client,
    base_url: String,
    registry: ContentTypeRegistry,
}

impl Invoker {
    /// Create an invoker against a base URL. The client carries the
    /// app-level timeout.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            registry: ContentTypeRegistry::default(),
        }
    }

    /// Execute one tool call.
    ///
    /// Argument and URL problems abort the call with an error; anything
    /// that happens after the request is on the wire comes back as a
    /// transport-error result.
    pub async fn execute(
        &self,
        input: &HandlerInput,
        args: &Map<String, Value>,
    ) -> Result<ExecutionResult> {
        let params = ToolParams::split(args);

        let url = self.build_url(&input.path, &params)?;
        let payload = self.build_body(input, &params)?;
        let headers = build_headers(input, &params, payload.as_ref());

        let method = Method::from_bytes(input.method.as_bytes())
            .map_err(|_| Error::ParamsInvalid(format!("invalid HTTP method {:?}", input.method)))?;

        debug!(method = %method, url = %url, "Invoking upstream operation");

        let mut request = self.client.request(method, url.clone());
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = payload {
            request = request.body(payload.bytes);
        }

        let started_wall = chrono::Utc::now();
        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url = %url, error = %err, "Upstream request failed");
                return Ok(ExecutionResult::transport_error(&err.to_string()));
            }
        };

        let status = response.status();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let content_type = response_headers
            .get("content-type")
            .cloned()
            .unwrap_or_default();

        let body = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url = %url, error = %err, "Reading upstream response failed");
                return Ok(ExecutionResult::transport_error(&err.to_string()));
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let text = String::from_utf8_lossy(&body);

        let mut result = ExecutionResult {
            content: format!(
                "HTTP {} {url}\nStatus: {}\nResponse: {text}",
                input.method,
                status.as_u16()
            ),
            error: None,
            metadata: BTreeMap::new(),
        };

        result.set_meta(meta::EXECUTION_TIME, json!(started_wall.to_rfc3339()));
        result.set_meta(meta::HTTP_STATUS, json!(status.as_u16()));
        result.set_meta(meta::RESPONSE_TIME, json!(elapsed_ms));
        result.set_meta(meta::HTTP_METHOD, json!(input.method));
        result.set_meta(meta::FINAL_URL, json!(url.as_str()));
        result.set_meta(meta::RESPONSE_HEADERS, json!(response_headers));
        result.set_meta(meta::ACTUAL_CONTENT_TYPE, json!(content_type));

        if content_type.contains("application/json") {
            result.set_meta(meta::IS_JSON_DATA, json!(true));
            result.set_meta(meta::PREFERRED_FORMAT, json!("json"));
        }
        if status.as_u16() >= 400 {
            result.set_meta(meta::IS_ERROR_RESPONSE, json!(true));
            result.set_meta(meta::SHOULD_REDACT, json!(true));
        }
        if body.len() > meta::DISPLAY_THRESHOLD {
            result.set_meta(meta::SHOULD_TRUNCATE, json!(true));
            result.set_meta(meta::MAX_DISPLAY_SIZE, json!(meta::DISPLAY_THRESHOLD));
        }

        Ok(result)
    }

    /// Substitute path placeholders and append query parameters. Query
    /// entries are appended for every method, request bodies included.
    fn build_url(&self, path: &str, params: &ToolParams) -> Result<Url> {
        let mut rendered = path.to_string();
        for (name, value) in &params.path {
            rendered = rendered.replace(&format!("{{{name}}}"), &render_scalar(value));
        }

        let joined = format!("{}{rendered}", self.base_url);
        let mut url = Url::parse(&joined)
            .map_err(|err| Error::ParamsInvalid(format!("invalid request URL {joined:?}: {err}")))?;

        if !params.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &params.query {
                pairs.append_pair(name, &render_scalar(value));
            }
        }

        Ok(url)
    }

    /// Serialize the body submap after folding in static appends.
    fn build_body(
        &self,
        input: &HandlerInput,
        params: &ToolParams,
    ) -> Result<Option<BodyPayload>> {
        let mut body = params.body.clone();
        for (name, value) in &input.body_append {
            body.entry(name.clone()).or_insert_with(|| value.clone());
        }
        if body.is_empty() {
            return Ok(None);
        }
        self.registry.for_content_type(&input.content_type).serialize(&body)
    }
}

/// Assemble request headers: Content-Type first, then static and
/// per-call header parameters, then the flattened Cookie header.
fn build_headers(
    input: &HandlerInput,
    params: &ToolParams,
    payload: Option<&BodyPayload>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    if let Some(payload) = payload {
        let content_type = payload.content_type.clone().unwrap_or_else(|| {
            if input.content_type.is_empty() {
                DEFAULT_BODY_CONTENT_TYPE.to_string()
            } else {
                input.content_type.clone()
            }
        });
        headers.insert("Content-Type".to_string(), content_type);
    }

    for (name, value) in &input.headers {
        headers.insert(name.clone(), value.clone());
    }
    for (name, value) in &params.header {
        headers.insert(name.clone(), render_scalar(value));
    }

    let mut cookies: Vec<String> = input
        .cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    cookies.extend(
        params
            .cookie
            .iter()
            .map(|(name, value)| format!("{name}={}", render_scalar(value))),
    );
    if !cookies.is_empty() {
        headers.insert("Cookie".to_string(), cookies.join("; "));
    }

    headers
}
