//! Stdio transport
//!
//! Line-delimited JSON-RPC over stdin/stdout. One message per line;
//! responses are written back as single lines. All logging goes to
//! stderr so the protocol stream stays clean.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use super::handler::McpHandler;
use crate::Result;
use crate::error::rpc_codes;
use crate::protocol::{JsonRpcMessage, JsonRpcResponse};

/// Serve the app over stdin/stdout until EOF.
pub async fn serve(handler: McpHandler) -> Result<()> {
    info!(app = %handler.app().name, "Serving on stdio");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let Some(response) = process_line(&handler, &line).await else {
            continue;
        };
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    debug!("Stdin closed, shutting down");
    Ok(())
}

/// Handle one input line. Blank lines and notifications yield nothing;
/// unparseable lines yield a parse-error response.
async fn process_line(handler: &McpHandler, line: &str) -> Option<JsonRpcResponse> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<JsonRpcMessage>(trimmed) {
        Ok(message) => handler.handle_message(message).await,
        Err(err) => Some(JsonRpcResponse::error(
            None,
            rpc_codes::PARSE_ERROR,
            format!("parse error: {err}"),
        )),
    }
}
