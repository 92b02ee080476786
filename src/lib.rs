//! makemcp library
//!
//! Builds a Model Context Protocol server from an API description.
//! Every operation in an OpenAPI 3.x document becomes one MCP tool with
//! a flattened input schema; calling the tool issues the corresponding
//! HTTP request against the configured upstream.
//!
//! # Layout
//!
//! - [`source`]: adapters that parse a description into an [`app::App`]
//! - [`server`]: MCP serving over stdio and streamable HTTP
//! - [`protocol`]: MCP wire types
//! - [`app`]: the app model and its JSON config persistence

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod error;
pub mod protocol;
pub mod safety;
pub mod server;
pub mod source;
pub mod tool;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging.
///
/// Logs always go to stderr: the stdio transport owns stdout for the
/// protocol stream.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
