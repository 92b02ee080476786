//! Source adapters
//!
//! A source turns one kind of API description into an [`App`]. Sources
//! register in a process-wide table keyed by their type tag, so config
//! loading can route handler re-attachment without knowing concrete
//! adapter types.

pub mod openapi;

use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::app::App;
use crate::{Error, Result};

/// One source adapter.
#[async_trait]
pub trait Source: Send + Sync {
    /// Type tag stamped on apps and their tools.
    fn source_type(&self) -> &'static str;

    /// Validate raw parameters before any network or file I/O.
    fn validate_params(&self, params: &Value) -> Result<()>;

    /// Parse the source into an app. Tools come back handler-less.
    async fn parse(&self, params: &Value) -> Result<App>;

    /// Attach invocation handlers to every tool of a parsed or loaded
    /// app, using the parameters carried in `app.config`.
    fn attach_handlers(&self, app: &mut App) -> Result<()>;
}

/// All registered sources.
fn registry() -> &'static [Box<dyn Source>] {
    static REGISTRY: OnceLock<Vec<Box<dyn Source>>> = OnceLock::new();
    REGISTRY.get_or_init(|| vec![Box::new(openapi::OpenApiSource::default())])
}

/// Look up a source by its type tag.
pub fn lookup(source_type: &str) -> Result<&'static dyn Source> {
    registry()
        .iter()
        .find(|s| s.source_type() == source_type)
        .map(|s| s.as_ref())
        .ok_or_else(|| Error::UnknownSource(source_type.to_string()))
}
