//! OpenAPI source adapter
//!
//! Parses an OpenAPI 3.x document into an app whose tools mirror the
//! document's operations, and re-attaches HTTP invocation handlers to
//! apps loaded from disk.

pub mod content;
pub mod document;
pub mod invoke;
pub mod params;
pub mod sample;
pub mod synthesize;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::{App, Transport};
use crate::source::Source;
use crate::{Error, Result};

pub use synthesize::SOURCE_TYPE;

/// Parameters for building an app from an OpenAPI document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenApiParams {
    /// Document location: filesystem path or http(s) URL
    pub specs: String,
    /// Upstream base URL requests are issued against
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: i64,
    /// Reject the document on any resolution diagnostic
    #[serde(default)]
    pub strict_validate: bool,
    /// Transport the app serves on
    #[serde(default)]
    pub transport: Transport,
    /// Listen port for the http transport
    #[serde(default = "default_port")]
    pub port: String,
    /// Write the config file and exit without serving
    #[serde(default)]
    pub config_only: bool,
    /// Suppress URL safety warnings for local development targets
    #[serde(default)]
    pub dev_mode: bool,
    /// Config filename stem override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_timeout() -> i64 {
    30
}

fn default_port() -> String {
    "8080".to_string()
}

impl OpenApiParams {
    /// Validate parameters. Runs before any I/O so misconfiguration
    /// fails fast.
    pub fn validate(&self) -> Result<()> {
        if self.specs.is_empty() {
            return Err(Error::ParamsInvalid("specs location is required".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(Error::ParamsInvalid("base URL is required".to_string()));
        }
        if self.base_url.contains("://") {
            url::Url::parse(&self.base_url)
                .map_err(|err| Error::ParamsInvalid(format!("invalid base URL: {err}")))?;
        }
        if self.timeout <= 0 {
            return Err(Error::ParamsInvalid(format!(
                "timeout must be positive, got {}",
                self.timeout
            )));
        }
        Ok(())
    }
}

/// The OpenAPI source.
#[derive(Debug, Default)]
pub struct OpenApiSource;

impl OpenApiSource {
    fn decode_params(params: &Value) -> Result<OpenApiParams> {
        serde_json::from_value(params.clone())
            .map_err(|err| Error::ParamsInvalid(format!("openapi parameters: {err}")))
    }
}

#[async_trait]
impl Source for OpenApiSource {
    fn source_type(&self) -> &'static str {
        SOURCE_TYPE
    }

    fn validate_params(&self, params: &Value) -> Result<()> {
        Self::decode_params(params)?.validate()
    }

    async fn parse(&self, params: &Value) -> Result<App> {
        let decoded = Self::decode_params(params)?;
        decoded.validate()?;

        let doc = document::load(&decoded.specs, decoded.strict_validate).await?;
        let registry = content::ContentTypeRegistry::default();
        let tools = synthesize::synthesize(&doc, &registry);
        info!(
            name = %doc.info.title,
            version = %doc.info.version,
            tools = tools.len(),
            "Parsed OpenAPI document"
        );

        Ok(App {
            name: doc.info.title,
            version: doc.info.version,
            source_type: SOURCE_TYPE.to_string(),
            tools,
            config: serde_json::to_value(&decoded)?,
        })
    }

    fn attach_handlers(&self, app: &mut App) -> Result<()> {
        let decoded = Self::decode_params(&app.config)?;
        decoded.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(decoded.timeout.unsigned_abs()))
            .build()?;
        let invoker = invoke::Invoker::new(client, &decoded.base_url);

        for tool in &mut app.tools {
            let invoker = invoker.clone();
            let input = tool.handler_input.clone();
            tool.handler = Some(std::sync::Arc::new(move |args| {
                let invoker = invoker.clone();
                let input = input.clone();
                Box::pin(async move {
                    match invoker.execute(&input, &args).await {
                        Ok(result) => result,
                        Err(err) => crate::tool::ExecutionResult::transport_error(&err.to_string()),
                    }
                })
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(specs: &str, base: &str, timeout: i64) -> Value {
        json!({"specs": specs, "baseUrl": base, "timeout": timeout})
    }

    #[test]
    fn validation_rejects_bad_params_before_io() {
        let src = OpenApiSource;
        assert!(matches!(
            src.validate_params(&params("", "https://x", 30)),
            Err(Error::ParamsInvalid(_))
        ));
        assert!(matches!(
            src.validate_params(&params("s.yaml", "", 30)),
            Err(Error::ParamsInvalid(_))
        ));
        assert!(matches!(
            src.validate_params(&params("s.yaml", "https://x", 0)),
            Err(Error::ParamsInvalid(_))
        ));
        assert!(matches!(
            src.validate_params(&params("s.yaml", "ht tp://bad url", 30)),
            Err(Error::ParamsInvalid(_))
        ));
        assert!(src.validate_params(&params("s.yaml", "https://x", 30)).is_ok());
    }

    #[test]
    fn timeout_defaults_when_absent() {
        let decoded: OpenApiParams =
            serde_json::from_value(json!({"specs": "s.yaml", "baseUrl": "https://x"})).unwrap();
        assert_eq!(decoded.timeout, 30);
        assert!(!decoded.strict_validate);
        assert_eq!(decoded.transport, Transport::Stdio);
        assert_eq!(decoded.port, "8080");
        assert!(!decoded.config_only);
        assert!(decoded.file.is_none());
    }

    #[test]
    fn shared_serve_fields_survive_the_config() {
        let decoded: OpenApiParams = serde_json::from_value(json!({
            "specs": "s.yaml",
            "baseUrl": "https://x",
            "transport": "http",
            "port": "9090",
            "configOnly": true,
            "devMode": true,
            "file": "petstore",
        }))
        .unwrap();

        let round = serde_json::to_value(&decoded).unwrap();
        assert_eq!(round["transport"], "http");
        assert_eq!(round["port"], "9090");
        assert_eq!(round["configOnly"], true);
        assert_eq!(round["devMode"], true);
        assert_eq!(round["file"], "petstore");
    }

    #[tokio::test]
    async fn parse_builds_app_and_attach_binds_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(
            &path,
            r#"
openapi: "3.0.0"
info:
  title: Tiny API
  version: "1.0"
paths:
  /ping:
    get:
      operationId: ping
      responses:
        "200":
          description: ok
"#,
        )
        .unwrap();

        let src = OpenApiSource;
        let raw = params(path.to_str().unwrap(), "http://127.0.0.1:9", 5);
        let mut app = src.parse(&raw).await.unwrap();

        assert_eq!(app.name, "Tiny API");
        assert_eq!(app.version, "1.0");
        assert_eq!(app.source_type, "openapi");
        assert_eq!(app.tools.len(), 1);
        assert!(app.tools[0].handler.is_none());

        src.attach_handlers(&mut app).unwrap();
        assert!(app.tools.iter().all(|t| t.handler.is_some()));
    }
}
