//! Error types for makemcp

use std::io;

use thiserror::Error;

/// Result type alias for makemcp
pub type Result<T> = std::result::Result<T, Error>;

/// makemcp errors
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing source parameters
    #[error("Invalid parameters: {0}")]
    ParamsInvalid(String),

    /// OpenAPI document could not be fetched or read
    #[error("Spec unreachable: {0}")]
    SpecUnreachable(String),

    /// OpenAPI document could not be parsed
    #[error("Spec malformed: {0}")]
    SpecMalformed(String),

    /// OpenAPI document rejected in strict mode
    #[error("Spec invalid: {0}")]
    SpecInvalid(String),

    /// Reading or writing the JSON configuration file
    #[error("Config error: {0}")]
    Config(String),

    /// Unknown source type in a configuration file
    #[error("Unknown source type: {0}")]
    UnknownSource(String),

    /// Transport error (stdio/http serving)
    #[error("Transport error: {0}")]
    Transport(String),

    /// MCP protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Tool not found during a call
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::Protocol(_) => rpc_codes::INVALID_REQUEST,
            Self::ToolNotFound(_) | Self::ParamsInvalid(_) => rpc_codes::INVALID_PARAMS,
            Self::Transport(_) => rpc_codes::SERVER_ERROR_START,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server error range start
    pub const SERVER_ERROR_START: i32 = -32000;
}
