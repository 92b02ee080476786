//! App model and config persistence
//!
//! An [`App`] is the product of parsing one source: identity, the
//! synthesized tools, and the source parameters needed to rebuild
//! handlers after a config load. Apps serialize to a single JSON file
//! so a parse can be done once and served many times.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::tool::ToolDescriptor;
use crate::{Error, Result};

/// Serving transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Line-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// Streamable HTTP endpoint
    Http,
}

impl std::str::FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(Error::ParamsInvalid(format!(
                "unknown transport {other:?}, expected stdio or http"
            ))),
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// How a build run should serve (or not serve) its app.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Transport to serve on
    pub transport: Transport,
    /// Listen port for the HTTP transport
    pub port: String,
    /// Write the config file and exit without serving
    pub config_only: bool,
    /// Suppress URL safety warnings for local development targets
    pub dev_mode: bool,
    /// Config filename stem override
    pub file: Option<String>,
}

/// One runnable app: identity, tools, and the source parameters they
/// were built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// App name, taken from the source document
    pub name: String,
    /// App version, taken from the source document
    pub version: String,
    /// Tag of the source that built this app
    #[serde(rename = "sourceType")]
    pub source_type: String,
    /// Synthesized tools, handlers detached
    pub tools: Vec<ToolDescriptor>,
    /// Source parameters, kept verbatim for handler re-attachment
    pub config: Value,
}

impl App {
    /// Derive the config filename: the `--file` stem when given,
    /// otherwise `<name>_makemcp.json`.
    #[must_use]
    pub fn config_filename(&self, file: Option<&str>) -> String {
        match file {
            Some(stem) => format!("{stem}.json"),
            None => format!("{}_makemcp.json", self.name),
        }
    }

    /// Persist the app to its config file in the current directory.
    /// Returns the path written.
    pub fn save(&self, file: Option<&str>) -> Result<PathBuf> {
        let path = PathBuf::from(self.config_filename(file));
        let encoded = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, encoded)?;
        info!(path = %path.display(), tools = self.tools.len(), "Saved app config");
        Ok(path)
    }

    /// Load an app from a config file. Handlers are not attached;
    /// callers re-attach through the source registry.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|err| {
            Error::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        let app: Self = serde_json::from_slice(&raw)
            .map_err(|err| Error::Config(format!("malformed config {}: {err}", path.display())))?;
        if app.source_type.is_empty() {
            return Err(Error::Config(format!(
                "config {} has no sourceType",
                path.display()
            )));
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app() -> App {
        App {
            name: "Users API".to_string(),
            version: "2.0".to_string(),
            source_type: "openapi".to_string(),
            tools: Vec::new(),
            config: json!({"specs": "users.yaml", "baseUrl": "https://api.example"}),
        }
    }

    #[test]
    fn filename_defaults_to_name_suffix() {
        assert_eq!(app().config_filename(None), "Users API_makemcp.json");
        assert_eq!(app().config_filename(Some("users")), "users.json");
    }

    #[test]
    fn transport_parses_and_rejects() {
        assert_eq!("stdio".parse::<Transport>().unwrap(), Transport::Stdio);
        assert_eq!("http".parse::<Transport>().unwrap(), Transport::Http);
        assert!("tcp".parse::<Transport>().is_err());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        let original = app();
        std::fs::write(&path, serde_json::to_vec_pretty(&original).unwrap()).unwrap();

        let loaded = App::load(&path).unwrap();
        assert_eq!(loaded.name, original.name);
        assert_eq!(loaded.source_type, "openapi");
        assert_eq!(loaded.config["baseUrl"], "https://api.example");
    }

    #[test]
    fn load_rejects_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            App::load(&dir.path().join("absent.json")),
            Err(Error::Config(_))
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, b"not json").unwrap();
        assert!(matches!(App::load(&bad), Err(Error::Config(_))));
    }
}
