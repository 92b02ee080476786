//! MCP serving
//!
//! A shared dispatcher plus one module per transport.

pub mod handler;
pub mod http;
pub mod stdio;

pub use handler::McpHandler;

use crate::Result;
use crate::app::{App, Transport};

/// Serve an app on the chosen transport until it terminates.
pub async fn serve(app: App, transport: Transport, port: &str) -> Result<()> {
    let handler = McpHandler::new(app);
    match transport {
        Transport::Stdio => stdio::serve(handler).await,
        Transport::Http => http::serve(handler, port).await,
    }
}
