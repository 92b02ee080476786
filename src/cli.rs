//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// makemcp - Serve any OpenAPI-described service as an MCP server
#[derive(Parser, Debug)]
#[command(name = "makemcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MAKEMCP_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MAKEMCP_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build an MCP server from an `OpenAPI` 3.x document
    Openapi(OpenApiArgs),

    /// Serve a previously saved config file
    Load {
        /// Path to the config file
        #[arg(required = true)]
        config: PathBuf,

        /// Serving options
        #[command(flatten)]
        serve: ServeArgs,
    },
}

/// Arguments for building from an `OpenAPI` document
#[derive(Args, Debug)]
pub struct OpenApiArgs {
    /// Document location: filesystem path or http(s) URL
    #[arg(short, long, required = true)]
    pub specs: String,

    /// Upstream base URL requests are issued against
    #[arg(short, long, required = true)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, alias = "to", default_value_t = 30)]
    pub timeout: i64,

    /// Reject the document on any `$ref` resolution problem
    #[arg(long)]
    pub strict: bool,

    /// Write the config file and exit without serving
    #[arg(long, alias = "co")]
    pub config_only: bool,

    /// Config filename stem (writes `<file>.json`)
    #[arg(short, long)]
    pub file: Option<String>,

    /// Serving options
    #[command(flatten)]
    pub serve: ServeArgs,
}

/// Serving options shared by build and load. Left unset, `load` falls
/// back to the values persisted in the config file.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Transport to serve on (stdio, http; default stdio)
    #[arg(short, long)]
    pub transport: Option<String>,

    /// Listen port for the http transport (default 8080)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Suppress base-URL safety warnings for local development
    #[arg(long)]
    pub dev_mode: bool,
}
